//! # Query Descriptor Translation
//!
//! Renders [`Filter`]/[`Sort`]/[`Page`] descriptors onto a
//! [`sqlx::QueryBuilder`], producing parameterized SQL.
//!
//! ## Translation Rules
//! ```text
//! Eq { field, value }          →  field = ?
//! Contains (insensitive)       →  field LIKE '%term%' ESCAPE '\'
//! Contains (sensitive)         →  instr(field, term) > 0
//! Filter { all, any }          →  a AND b AND (x OR y)
//! Sort + tiebreak              →  ORDER BY field dir, rowid
//! Page                         →  LIMIT ? OFFSET ?
//! ```
//!
//! A count query is produced by pushing the same filter onto a
//! `SELECT COUNT(*)` head and skipping the pagination clause, so row and
//! count variants always share identical filter logic. The rowid tiebreak
//! keeps row order deterministic when the sort key ties (rowid reflects
//! insertion order).

use sqlx::{QueryBuilder, Sqlite};

use bazaar_core::query::{Filter, Page, Predicate, Scalar, Sort, SortDir};

/// Appends a WHERE clause for `filter`. No-op for an empty filter.
pub(crate) fn push_where(qb: &mut QueryBuilder<'_, Sqlite>, filter: &Filter) {
    if filter.is_empty() {
        return;
    }

    qb.push(" WHERE ");
    let mut first = true;

    for predicate in filter.all_clauses() {
        if !first {
            qb.push(" AND ");
        }
        first = false;
        push_predicate(qb, predicate);
    }

    if !filter.any_clauses().is_empty() {
        if !first {
            qb.push(" AND ");
        }
        qb.push("(");
        let mut first_or = true;
        for predicate in filter.any_clauses() {
            if !first_or {
                qb.push(" OR ");
            }
            first_or = false;
            push_predicate(qb, predicate);
        }
        qb.push(")");
    }
}

/// Appends `ORDER BY <sort>, <tiebreak>`. The tiebreak column (rowid,
/// possibly table-qualified for joins) breaks sort-key ties by insertion
/// order so identical descriptors always return rows in the same order.
pub(crate) fn push_order_by(qb: &mut QueryBuilder<'_, Sqlite>, sort: &Sort, tiebreak: &str) {
    qb.push(" ORDER BY ");
    qb.push(sort.field.name());
    qb.push(match sort.dir {
        SortDir::Asc => " ASC",
        SortDir::Desc => " DESC",
    });
    qb.push(", ");
    qb.push(tiebreak);
}

/// Appends `LIMIT ? OFFSET ?`. Never used on count queries.
pub(crate) fn push_page(qb: &mut QueryBuilder<'_, Sqlite>, page: &Page) {
    qb.push(" LIMIT ");
    qb.push_bind(page.limit());
    qb.push(" OFFSET ");
    qb.push_bind(page.offset());
}

fn push_predicate(qb: &mut QueryBuilder<'_, Sqlite>, predicate: &Predicate) {
    match predicate {
        Predicate::Eq { field, value } => {
            qb.push(field.name());
            qb.push(" = ");
            push_scalar(qb, value);
        }
        Predicate::Contains {
            field,
            term,
            case_insensitive,
        } => {
            if *case_insensitive {
                // SQLite LIKE is ASCII-case-insensitive by default.
                qb.push(field.name());
                qb.push(" LIKE ");
                qb.push_bind(like_pattern(term));
                qb.push(" ESCAPE '\\'");
            } else {
                qb.push("instr(");
                qb.push(field.name());
                qb.push(", ");
                qb.push_bind(term.clone());
                qb.push(") > 0");
            }
        }
    }
}

fn push_scalar(qb: &mut QueryBuilder<'_, Sqlite>, scalar: &Scalar) {
    match scalar {
        Scalar::Int(v) => {
            qb.push_bind(*v);
        }
        Scalar::Text(v) => {
            qb.push_bind(v.clone());
        }
        Scalar::Bool(v) => {
            qb.push_bind(*v);
        }
    }
}

/// Wraps a search term in wildcards, escaping LIKE metacharacters so the
/// term is matched literally.
fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use bazaar_core::query::Field;

    const CATEGORY: Field = Field::new("category");
    const NAME: Field = Field::new("name");
    const DESCRIPTION: Field = Field::new("description");

    #[test]
    fn test_empty_filter_produces_no_where() {
        let mut qb = QueryBuilder::new("SELECT * FROM products");
        push_where(&mut qb, &Filter::new());
        assert_eq!(qb.sql(), "SELECT * FROM products");
    }

    #[test]
    fn test_eq_and_disjunction_compose_with_and() {
        let filter = Filter::new().eq(CATEGORY, "Skincare").or_any([
            Predicate::contains(NAME, "Vitamin").unwrap(),
            Predicate::contains(DESCRIPTION, "Vitamin").unwrap(),
        ]);

        let mut qb = QueryBuilder::new("SELECT * FROM products");
        push_where(&mut qb, &filter);
        let sql = qb.sql();

        assert!(sql.contains("WHERE category = "));
        assert!(sql.contains("AND (name LIKE "));
        assert!(sql.contains(" OR description LIKE "));
    }

    #[test]
    fn test_case_sensitive_contains_uses_instr() {
        let filter =
            Filter::new().and(Predicate::contains_case_sensitive(NAME, "Vitamin").unwrap());
        let mut qb = QueryBuilder::new("SELECT * FROM products");
        push_where(&mut qb, &filter);
        assert!(qb.sql().contains("instr(name, "));
    }

    #[test]
    fn test_order_and_page() {
        let mut qb = QueryBuilder::new("SELECT * FROM products");
        push_order_by(&mut qb, &Sort::created_desc(), "rowid");
        push_page(&mut qb, &Page::new(10, 20));
        let sql = qb.sql();
        assert!(sql.contains("ORDER BY created_at DESC, rowid"));
        assert!(sql.contains("LIMIT "));
        assert!(sql.contains("OFFSET "));
    }

    #[test]
    fn test_like_pattern_escapes_metacharacters() {
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
        assert_eq!(like_pattern("plain"), "%plain%");
    }
}
