use super::repo_tx_mysql::MySqlTx;
use crate::domain_port::*;
use sqlx::mysql::MySqlDatabaseError;

const ER_DUP_ENTRY: u16 = 1062;

/// Recover the concrete transaction behind a `StorageTx`.
///
/// Every `StorageTx` reaching a MySQL repository was produced by
/// `MySqlTxManager::begin`, so the trait object always points at a `MySqlTx`.
pub fn downcast<'a, 't>(tx: &'a mut dyn StorageTx<'t>) -> &'a mut MySqlTx<'t> {
    // SAFETY: see above; the data pointer of the trait object is a MySqlTx<'t>.
    unsafe {
        let p = tx as *mut dyn StorageTx<'t>;
        let p = p as *mut MySqlTx<'t>;
        &mut *p
    }
}

/// True when a write failed on a unique index, e.g. two concurrent
/// registrations of the same username.
pub fn is_dup_key(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => db
            .try_downcast_ref::<MySqlDatabaseError>()
            .is_some_and(|e| e.number() == ER_DUP_ENTRY),
        _ => false,
    }
}
