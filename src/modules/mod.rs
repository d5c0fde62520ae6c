pub mod authz;
pub mod users;
