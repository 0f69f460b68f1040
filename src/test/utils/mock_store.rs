use crate::db::{Field, Row, Store};
use crate::error::AppError;
use mockall::mock;
use rusqlite::types::Value;

mock! {
    pub Store {}

    impl Store for Store {
        fn insert(&self, table: &str, fields: &[Field]) -> Result<(), AppError>;
        fn query(&self, statement: &str, params: &[Value]) -> Result<Vec<Row>, AppError>;
    }
}
