//! Vendor differences the renderer cares about: identifier quoting, null
//! ordering, row limits and pessimistic locking.

use crate::config::DialectKind;
use crate::criteria::{LockMode, NullPrecedence, RowSelection};

pub trait Dialect: Send + Sync {
    fn kind(&self) -> DialectKind;

    fn open_quote(&self) -> char {
        '"'
    }

    fn close_quote(&self) -> char {
        '"'
    }

    /// Quote backtick-wrapped segments of a possibly qualified identifier;
    /// other segments are left as written.
    fn quote_identifier(&self, identifier: &str) -> String {
        identifier
            .split('.')
            .map(|segment| {
                match segment
                    .strip_prefix('`')
                    .and_then(|s| s.strip_suffix('`'))
                {
                    Some(inner) => format!("{}{}{}", self.open_quote(), inner, self.close_quote()),
                    None => segment.to_string(),
                }
            })
            .collect::<Vec<_>>()
            .join(".")
    }

    fn supports_null_precedence(&self) -> bool {
        true
    }

    /// One ORDER BY term.
    fn order_term(&self, expression: &str, direction: &str, nulls: Option<NullPrecedence>) -> String {
        match nulls {
            None => format!("{} {}", expression, direction),
            Some(precedence) if self.supports_null_precedence() => {
                let position = match precedence {
                    NullPrecedence::First => "first",
                    NullPrecedence::Last => "last",
                };
                format!("{} {} nulls {}", expression, direction, position)
            }
            Some(NullPrecedence::First) => format!(
                "case when {} is null then 0 else 1 end, {} {}",
                expression, expression, direction
            ),
            Some(NullPrecedence::Last) => format!(
                "case when {} is null then 1 else 0 end, {} {}",
                expression, expression, direction
            ),
        }
    }

    /// Row window appended after ORDER BY, rendered with literal bounds.
    fn limit_clause(&self, selection: &RowSelection, _has_order_by: bool) -> Option<String> {
        let offset = selection.first_result.unwrap_or(0);
        match (offset, selection.max_results) {
            (0, None) => None,
            (0, Some(max)) => Some(format!(" fetch first {} rows only", max)),
            (offset, None) => Some(format!(" offset {} rows", offset)),
            (offset, Some(max)) => Some(format!(
                " offset {} rows fetch next {} rows only",
                offset, max
            )),
        }
    }

    /// Table hint placed after a table alias in FROM/JOIN.
    fn lock_hint(&self, _mode: LockMode) -> Option<String> {
        None
    }

    /// Trailing lock clause for `(alias, mode)` pairs with a mode other than none.
    fn lock_clause(&self, locks: &[(String, LockMode)]) -> Option<String> {
        strongest(locks).map(|_| " for update".to_string())
    }
}

fn strongest(locks: &[(String, LockMode)]) -> Option<LockMode> {
    locks
        .iter()
        .map(|(_, mode)| *mode)
        .filter(|mode| !mode.is_none())
        .max()
}

fn locked_aliases(locks: &[(String, LockMode)]) -> Vec<&str> {
    locks
        .iter()
        .filter(|(_, mode)| !mode.is_none())
        .map(|(alias, _)| alias.as_str())
        .collect()
}

// ============================================================================
// Dialects
// ============================================================================

/// ANSI SQL:2008 row limiting, plain `for update`.
#[derive(Debug, Default, Clone, Copy)]
pub struct GenericDialect;

impl Dialect for GenericDialect {
    fn kind(&self) -> DialectKind {
        DialectKind::Generic
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct PostgresDialect;

impl Dialect for PostgresDialect {
    fn kind(&self) -> DialectKind {
        DialectKind::Postgres
    }

    fn limit_clause(&self, selection: &RowSelection, _has_order_by: bool) -> Option<String> {
        let offset = selection.first_result.unwrap_or(0);
        match (offset, selection.max_results) {
            (0, None) => None,
            (0, Some(max)) => Some(format!(" limit {}", max)),
            (offset, None) => Some(format!(" offset {}", offset)),
            (offset, Some(max)) => Some(format!(" limit {} offset {}", max, offset)),
        }
    }

    fn lock_clause(&self, locks: &[(String, LockMode)]) -> Option<String> {
        let mode = strongest(locks)?;
        let keyword = match mode {
            LockMode::PessimisticRead => "for share",
            _ => "for update",
        };
        let suffix = match mode {
            LockMode::UpgradeNowait => " nowait",
            LockMode::UpgradeSkipLocked => " skip locked",
            _ => "",
        };
        Some(format!(
            " {} of {}{}",
            keyword,
            locked_aliases(locks).join(", "),
            suffix
        ))
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct MySqlDialect;

impl Dialect for MySqlDialect {
    fn kind(&self) -> DialectKind {
        DialectKind::Mysql
    }

    fn open_quote(&self) -> char {
        '`'
    }

    fn close_quote(&self) -> char {
        '`'
    }

    fn supports_null_precedence(&self) -> bool {
        false
    }

    fn limit_clause(&self, selection: &RowSelection, _has_order_by: bool) -> Option<String> {
        let offset = selection.first_result.unwrap_or(0);
        match (offset, selection.max_results) {
            (0, None) => None,
            (0, Some(max)) => Some(format!(" limit {}", max)),
            // MySQL has no offset without a row count
            (offset, None) => Some(format!(" limit {}, {}", offset, u64::MAX)),
            (offset, Some(max)) => Some(format!(" limit {}, {}", offset, max)),
        }
    }

    fn lock_clause(&self, locks: &[(String, LockMode)]) -> Option<String> {
        Some(
            match strongest(locks)? {
                LockMode::PessimisticRead => " lock in share mode",
                LockMode::UpgradeNowait => " for update nowait",
                LockMode::UpgradeSkipLocked => " for update skip locked",
                _ => " for update",
            }
            .to_string(),
        )
    }
}

/// Locks through table hints; row limits need an ORDER BY.
#[derive(Debug, Default, Clone, Copy)]
pub struct SqlServerDialect;

impl Dialect for SqlServerDialect {
    fn kind(&self) -> DialectKind {
        DialectKind::SqlServer
    }

    fn open_quote(&self) -> char {
        '['
    }

    fn close_quote(&self) -> char {
        ']'
    }

    fn supports_null_precedence(&self) -> bool {
        false
    }

    fn limit_clause(&self, selection: &RowSelection, has_order_by: bool) -> Option<String> {
        if !selection.is_limited() {
            return None;
        }
        let mut clause = String::new();
        if !has_order_by {
            clause.push_str(" order by @@version");
        }
        clause.push_str(&format!(
            " offset {} rows",
            selection.first_result.unwrap_or(0)
        ));
        if let Some(max) = selection.max_results {
            clause.push_str(&format!(" fetch next {} rows only", max));
        }
        Some(clause)
    }

    fn lock_hint(&self, mode: LockMode) -> Option<String> {
        let hint = match mode {
            LockMode::None => return None,
            LockMode::PessimisticRead => "with (holdlock, rowlock)",
            LockMode::Upgrade => "with (updlock, rowlock)",
            LockMode::UpgradeNowait => "with (updlock, rowlock, nowait)",
            LockMode::UpgradeSkipLocked => "with (updlock, rowlock, readpast)",
        };
        Some(hint.to_string())
    }

    fn lock_clause(&self, _locks: &[(String, LockMode)]) -> Option<String> {
        None
    }
}

pub fn dialect_for(kind: DialectKind) -> Box<dyn Dialect> {
    match kind {
        DialectKind::Generic => Box::new(GenericDialect),
        DialectKind::Postgres => Box::new(PostgresDialect),
        DialectKind::Mysql => Box::new(MySqlDialect),
        DialectKind::SqlServer => Box::new(SqlServerDialect),
    }
}
