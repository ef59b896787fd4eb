//! SQL for the vote table.

pub mod votes;

/// `?,?,…,?` with `n` placeholders.
pub(crate) fn placeholders(n: usize) -> String {
    let mut sql = "?,".repeat(n);
    sql.pop();
    sql
}
