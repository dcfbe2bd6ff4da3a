pub(crate) mod accounts;
pub(crate) mod harvest;
pub(crate) mod import;
pub(crate) mod limits;
pub(crate) mod meta;
