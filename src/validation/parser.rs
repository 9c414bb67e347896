//! Parser-based validation of caller SQL.
//!
//! The text is tokenised and parsed with the MySQL dialect of
//! [sqlparser](https://docs.rs/sqlparser/). Only one statement is allowed, and
//! it must be a query, a `SHOW`, a `DESCRIBE`/`EXPLAIN` or a `USE`. Queries are
//! then walked with a [`Visitor`]: every query node (top level, CTE, UNION arm,
//! derived table, scalar or `IN`/`EXISTS` subquery) must have a read-only
//! shape, no function call anywhere may be in [`DANGEROUS_FUNCTIONS`], and no
//! table reference may be qualified by one of [`FORBIDDEN_SCHEMAS`].
//!
//! [`validate_combined`] is the single entry point used by the tools: parser
//! first, then the lexical layer in [`super::lexical`].

use crate::error::{DbError, DbResult};
use crate::validation::lexical::validate_sql;
use sqlparser::ast::{
    Expr, ObjectName, ObjectNamePart, Query, SetExpr, SetOperator, Statement, Visit, Visitor,
};
use sqlparser::dialect::MySqlDialect;
use sqlparser::parser::Parser;
use sqlparser::tokenizer::{Token, Tokenizer};
use std::collections::HashSet;
use std::fmt;
use std::ops::ControlFlow;
use std::sync::LazyLock;

/// Functions that can stall the server, hold locks or touch the filesystem.
pub const DANGEROUS_FUNCTIONS: [&str; 10] = [
    "sleep",
    "benchmark",
    "get_lock",
    "release_lock",
    "is_free_lock",
    "is_used_lock",
    "release_all_locks",
    "load_file",
    "sys_eval",
    "sys_exec",
];

/// System schemas no caller query may read from.
pub const FORBIDDEN_SCHEMAS: [&str; 4] = ["mysql", "information_schema", "performance_schema", "sys"];

static DANGEROUS_FUNCTION_SET: LazyLock<HashSet<&'static str>> =
    LazyLock::new(|| DANGEROUS_FUNCTIONS.into_iter().collect());

static FORBIDDEN_SCHEMA_SET: LazyLock<HashSet<&'static str>> =
    LazyLock::new(|| FORBIDDEN_SCHEMAS.into_iter().collect());

/// Kind of an accepted statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Select,
    Union,
    /// A parenthesised query, e.g. `(SELECT 1)`.
    ParenSelect,
    Show,
    /// `DESCRIBE`, `DESC` and `EXPLAIN`.
    OtherRead,
    Use,
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Select => "SELECT",
            Self::Union => "UNION",
            Self::ParenSelect => "parenthesised SELECT",
            Self::Show => "SHOW",
            Self::OtherRead => "DESCRIBE/EXPLAIN",
            Self::Use => "USE",
        };
        f.write_str(name)
    }
}

/// Count the non-empty statements in `sql`, splitting on semicolons the
/// tokenizer sees as separators. Semicolons inside literals and comments do
/// not count.
fn count_statements(sql: &str) -> DbResult<usize> {
    let dialect = MySqlDialect {};
    let tokens = Tokenizer::new(&dialect, sql)
        .tokenize()
        .map_err(|e| DbError::parse_failure(e.to_string()))?;

    let mut count = 0;
    let mut has_content = false;
    for token in tokens {
        match token {
            Token::SemiColon => {
                if has_content {
                    count += 1;
                }
                has_content = false;
            }
            Token::Whitespace(_) | Token::EOF => {}
            _ => has_content = true,
        }
    }
    if has_content {
        count += 1;
    }
    Ok(count)
}

/// Validate SQL with the MySQL parser and return the accepted statement kind.
///
/// # Examples
///
/// ```
/// use mysql_mcp_server::validation::{validate_with_parser, StatementKind};
///
/// let kind = validate_with_parser("SELECT id FROM users").unwrap();
/// assert_eq!(kind, StatementKind::Select);
/// assert!(validate_with_parser("SELECT * FROM mysql.user").is_err());
/// ```
pub fn validate_with_parser(sql: &str) -> DbResult<StatementKind> {
    let sql = sql.trim();
    if sql.is_empty() {
        return Err(DbError::EmptyInput);
    }

    match count_statements(sql)? {
        0 => return Err(DbError::EmptyInput),
        1 => {}
        _ => return Err(DbError::MultiStatement),
    }

    let statements = Parser::parse_sql(&MySqlDialect {}, sql)
        .map_err(|e| DbError::parse_failure(e.to_string()))?;

    match statements.as_slice() {
        [] => Err(DbError::EmptyInput),
        [statement] => validate_statement(statement),
        _ => Err(DbError::MultiStatement),
    }
}

/// Run the parser check, then the lexical check. Both must accept.
///
/// When the parser cannot read the text, a lexical rejection is reported in
/// preference to the bare parse failure since it names the offending pattern.
pub fn validate_combined(sql: &str) -> DbResult<StatementKind> {
    match validate_with_parser(sql) {
        Ok(kind) => {
            validate_sql(sql)?;
            Ok(kind)
        }
        Err(err @ DbError::ParseFailure { .. }) => {
            validate_sql(sql)?;
            Err(err)
        }
        Err(err) => Err(err),
    }
}

fn validate_statement(statement: &Statement) -> DbResult<StatementKind> {
    match statement {
        // =====================================================================
        // Read-only statements
        // =====================================================================
        Statement::Query(query) => {
            let kind = query_shape(&query.body)?;
            if let ControlFlow::Break(err) = statement.visit(&mut ReadOnlyVisitor) {
                return Err(err);
            }
            Ok(kind)
        }

        Statement::ShowTables { .. }
        | Statement::ShowViews { .. }
        | Statement::ShowObjects(_)
        | Statement::ShowCharset(_)
        | Statement::ShowColumns { .. }
        | Statement::ShowDatabases { .. }
        | Statement::ShowSchemas { .. }
        | Statement::ShowCreate { .. }
        | Statement::ShowFunctions { .. }
        | Statement::ShowVariable { .. }
        | Statement::ShowVariables { .. }
        | Statement::ShowStatus { .. }
        | Statement::ShowCollation { .. } => Ok(StatementKind::Show),

        Statement::ExplainTable { .. } => Ok(StatementKind::OtherRead),

        // EXPLAIN ANALYZE runs the statement, so it is treated like the statement
        // itself; plain EXPLAIN must still wrap something readable.
        Statement::Explain {
            statement: inner,
            analyze,
            ..
        } => {
            if *analyze {
                return Err(DbError::disallowed_kind("EXPLAIN ANALYZE"));
            }
            validate_statement(inner)?;
            Ok(StatementKind::OtherRead)
        }

        Statement::Use(_) => Ok(StatementKind::Use),

        // =====================================================================
        // Everything else is rejected with a kind-specific reason
        // =====================================================================
        other => Err(DbError::disallowed_kind(rejected_kind_name(other))),
    }
}

/// Describe a rejected statement for the error message.
fn rejected_kind_name(statement: &Statement) -> String {
    let category = match statement {
        Statement::Insert(_)
        | Statement::Update { .. }
        | Statement::Delete(_)
        | Statement::Merge { .. } => "DML",

        Statement::CreateDatabase { .. } | Statement::CreateSchema { .. } => "database DDL",

        Statement::CreateTable { .. }
        | Statement::CreateView { .. }
        | Statement::CreateIndex(_)
        | Statement::CreateFunction { .. }
        | Statement::CreateProcedure { .. }
        | Statement::CreateTrigger { .. }
        | Statement::AlterTable { .. }
        | Statement::AlterView { .. }
        | Statement::AlterIndex { .. }
        | Statement::Drop { .. }
        | Statement::DropFunction { .. }
        | Statement::DropProcedure { .. }
        | Statement::DropTrigger { .. }
        | Statement::Truncate { .. } => "DDL",

        Statement::Set(_) => "SET",

        Statement::StartTransaction { .. }
        | Statement::Commit { .. }
        | Statement::Rollback { .. }
        | Statement::Savepoint { .. }
        | Statement::ReleaseSavepoint { .. } => "transaction control",

        Statement::Grant { .. }
        | Statement::Revoke { .. }
        | Statement::Kill { .. }
        | Statement::Flush { .. }
        | Statement::LockTables { .. }
        | Statement::UnlockTables
        | Statement::Call { .. }
        | Statement::Execute { .. }
        | Statement::Prepare { .. }
        | Statement::Deallocate { .. }
        | Statement::Analyze { .. }
        | Statement::OptimizeTable { .. } => "administrative",

        _ => "unsupported",
    };

    let rendered = statement.to_string();
    let keywords: Vec<&str> = rendered.split_whitespace().take(2).collect();
    let keyword = match keywords.as_slice() {
        [first, second] if matches!(*first, "CREATE" | "ALTER" | "DROP" | "SHOW") => {
            format!("{} {}", first, second)
        }
        [first, ..] => (*first).to_string(),
        [] => String::new(),
    };

    if keyword.is_empty() {
        category.to_string()
    } else {
        format!("{} ({})", category, keyword)
    }
}

/// Check the shape of a query body and report its kind.
///
/// Only `SELECT`, `UNION [ALL]` of acceptable bodies, and parenthesised
/// queries pass. `SELECT … INTO`, `VALUES`, `TABLE`, `INTERSECT` and `EXCEPT`
/// are rejected.
fn query_shape(body: &SetExpr) -> DbResult<StatementKind> {
    match body {
        SetExpr::Select(select) => {
            if select.into.is_some() {
                return Err(DbError::disallowed_kind("SELECT INTO"));
            }
            Ok(StatementKind::Select)
        }
        SetExpr::Query(inner) => {
            query_shape(&inner.body)?;
            Ok(StatementKind::ParenSelect)
        }
        SetExpr::SetOperation {
            op, left, right, ..
        } => {
            if !matches!(op, SetOperator::Union) {
                return Err(DbError::disallowed_kind(op.to_string()));
            }
            query_shape(left)?;
            query_shape(right)?;
            Ok(StatementKind::Union)
        }
        SetExpr::Values(_) => Err(DbError::disallowed_kind("VALUES")),
        SetExpr::Table(_) => Err(DbError::disallowed_kind("TABLE")),
        _ => Err(DbError::disallowed_kind("non-SELECT query body")),
    }
}

/// Lowercased value of the last identifier part of a name.
fn last_part(name: &ObjectName) -> Option<String> {
    match name.0.last()? {
        ObjectNamePart::Identifier(ident) => Some(ident.value.to_lowercase()),
        _ => None,
    }
}

/// Lowercased schema qualifier of a table reference, if it has one.
fn schema_qualifier(name: &ObjectName) -> Option<String> {
    let parts = &name.0;
    if parts.len() < 2 {
        return None;
    }
    match &parts[parts.len() - 2] {
        ObjectNamePart::Identifier(ident) => Some(ident.value.to_lowercase()),
        _ => None,
    }
}

/// Walks every node of a query statement.
struct ReadOnlyVisitor;

impl Visitor for ReadOnlyVisitor {
    type Break = DbError;

    fn pre_visit_query(&mut self, query: &Query) -> ControlFlow<DbError> {
        match query_shape(&query.body) {
            Ok(_) => ControlFlow::Continue(()),
            Err(err) => ControlFlow::Break(err),
        }
    }

    fn pre_visit_relation(&mut self, relation: &ObjectName) -> ControlFlow<DbError> {
        match schema_qualifier(relation) {
            Some(schema) if FORBIDDEN_SCHEMA_SET.contains(schema.as_str()) => {
                ControlFlow::Break(DbError::forbidden_schema(schema))
            }
            _ => ControlFlow::Continue(()),
        }
    }

    fn pre_visit_expr(&mut self, expr: &Expr) -> ControlFlow<DbError> {
        if let Expr::Function(function) = expr {
            if let Some(name) = last_part(&function.name) {
                if DANGEROUS_FUNCTION_SET.contains(name.as_str()) {
                    return ControlFlow::Break(DbError::dangerous_function(name));
                }
            }
        }
        ControlFlow::Continue(())
    }
}
