use sea_orm::prelude::Expr;
use sea_orm::sea_query::{Func, LikeExpr};
use sea_orm::*;

/// Case-insensitive `LIKE` on one column. `pattern` must already be lowercased
/// and escaped with `\`, as produced by `models::shared::like_pattern`.
pub fn ilike<C: ColumnTrait>(column: C, pattern: &str) -> Condition {
    Condition::all()
        .add(Expr::expr(Func::lower(Expr::col(column))).like(LikeExpr::new(pattern).escape('\\')))
}

/// Match `pattern` against any of the given columns.
pub fn ilike_any<C: ColumnTrait>(columns: impl IntoIterator<Item = C>, pattern: &str) -> Condition {
    columns
        .into_iter()
        .fold(Condition::any(), |cond, column| cond.add(ilike(column, pattern)))
}
