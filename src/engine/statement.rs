//! Classifies statements with `sqlparser` before [`super::PolarsEngine`] runs them.
//!
//! `CREATE VIEW ... AS`, `DESCRIBE`, `DROP` and `COPY ... TO` are handled by the engine itself.
//! Queries are kept as an AST so every `read_*` table function in them can be swapped for a
//! relation holding the file's rows. Anything else is handed to `SQLContext` as written.

use sqlparser::ast::{
    self, BinaryOperator, DescribeAlias, Expr, FunctionArg, FunctionArgExpr, Ident, ObjectName,
    ObjectType, Query, Select, SelectItem, SetExpr, TableAlias, TableFactor, TableWithJoins,
    UnaryOperator, Value,
};
use sqlparser::dialect::GenericDialect;
use sqlparser::keywords::Keyword;
use sqlparser::parser::{Parser, ParserError};
use sqlparser::tokenizer::Token;

use crate::error::{EngineError, EngineResult};
use crate::identifier::{escape_sql_string, format_identifier_for_sql};

use super::copy::CopyOptions;

/// Prefix of the relations that stand in for `read_*` calls while a statement runs.
const READ_RELATION_PREFIX: &str = "__tabq_read_";

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// `CREATE [OR REPLACE] [TEMPORARY] VIEW|TABLE [IF NOT EXISTS] <name> AS <query>`
    CreateView {
        name: String,
        or_replace: bool,
        if_not_exists: bool,
        query: Box<Query>,
    },
    Describe(DescribeTarget),
    Drop {
        name: String,
        if_exists: bool,
    },
    Copy(CopyStatement),
    Query(Box<Query>),
    /// Any other statement, passed through untouched.
    Other(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum DescribeTarget {
    Relation(String),
    Query(Box<Query>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadFunction {
    Csv,
    Parquet,
    Json,
    Ndjson,
}

impl ReadFunction {
    pub fn sql_name(self) -> &'static str {
        match self {
            Self::Csv => "read_csv",
            Self::Parquet => "read_parquet",
            Self::Json => "read_json",
            Self::Ndjson => "read_ndjson",
        }
    }

    fn from_sql_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "read_csv" | "read_csv_auto" => Some(Self::Csv),
            "read_parquet" => Some(Self::Parquet),
            "read_json" | "read_json_auto" => Some(Self::Json),
            "read_ndjson" | "read_ndjson_auto" | "read_jsonl" => Some(Self::Ndjson),
            _ => None,
        }
    }
}

/// Literal option value in a read function call or `COPY` option list.
#[derive(Debug, Clone, PartialEq)]
pub enum OptionValue {
    Str(String),
    Int(i64),
    Bool(bool),
    Word(String),
}

impl OptionValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            Self::Int(i) => Some(*i != 0),
            Self::Str(s) | Self::Word(s) => match s.to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" => Some(true),
                "false" | "0" | "no" => Some(false),
                _ => None,
            },
        }
    }

    pub fn as_usize(&self) -> Option<usize> {
        match self {
            Self::Int(i) => usize::try_from(*i).ok(),
            Self::Str(s) | Self::Word(s) => s.parse().ok(),
            Self::Bool(_) => None,
        }
    }

    pub fn as_text(&self) -> String {
        match self {
            Self::Str(s) | Self::Word(s) => s.clone(),
            Self::Int(i) => i.to_string(),
            Self::Bool(b) => b.to_string(),
        }
    }

    fn to_sql(&self) -> String {
        match self {
            Self::Str(s) => escape_sql_string(s),
            Self::Int(i) => i.to_string(),
            Self::Bool(b) => b.to_string(),
            Self::Word(w) => w.clone(),
        }
    }

    fn from_expr(expr: &Expr) -> EngineResult<Self> {
        match expr {
            Expr::Value(Value::SingleQuotedString(s)) => Ok(Self::Str(s.clone())),
            Expr::Value(Value::Boolean(b)) => Ok(Self::Bool(*b)),
            Expr::Value(Value::Number(n, _)) => parse_int(n).map(Self::Int),
            Expr::UnaryOp {
                op: UnaryOperator::Minus,
                expr,
            } => match expr.as_ref() {
                Expr::Value(Value::Number(n, _)) => parse_int(n).map(|i| Self::Int(-i)),
                other => Err(invalid(&format!("unsupported option value {}", other))),
            },
            Expr::Identifier(word) => Ok(Self::Word(word.value.clone())),
            other => Err(invalid(&format!("unsupported option value {}", other))),
        }
    }
}

fn parse_int(text: &str) -> EngineResult<i64> {
    text.parse()
        .map_err(|_| invalid(&format!("expected an integer, got {}", text)))
}

pub type NamedOptions = Vec<(String, OptionValue)>;

/// A table-valued read function over a registered virtual file.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadCall {
    pub function: ReadFunction,
    pub path: String,
    pub options: NamedOptions,
}

impl ReadCall {
    pub fn new(function: ReadFunction, path: impl Into<String>) -> Self {
        Self {
            function,
            path: path.into(),
            options: Vec::new(),
        }
    }

    pub fn with_option(mut self, key: &str, value: OptionValue) -> Self {
        self.options.push((key.to_ascii_lowercase(), value));
        self
    }

    /// Look up an option by (case-insensitive) key.
    pub fn option(&self, key: &str) -> Option<&OptionValue> {
        self.options
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v)
    }

    pub fn to_sql(&self) -> String {
        let mut sql = format!("{}({}", self.function.sql_name(), escape_sql_string(&self.path));
        for (key, value) in &self.options {
            sql.push_str(&format!(", {} = {}", key, value.to_sql()));
        }
        sql.push(')');
        sql
    }

    /// First argument is the quoted file name; the rest are `key = value` options or bare flags.
    fn from_args(function: ReadFunction, args: &[FunctionArg]) -> EngineResult<Self> {
        let mut args = args.iter();
        let path = match args.next() {
            Some(FunctionArg::Unnamed(FunctionArgExpr::Expr(Expr::Value(
                Value::SingleQuotedString(path),
            )))) => path.clone(),
            _ => {
                return Err(invalid(&format!(
                    "{} expects a quoted file name as its first argument",
                    function.sql_name()
                )))
            }
        };
        let mut call = Self::new(function, path);
        for arg in args {
            let (key, value) = named_option(arg)?;
            call.options.push((key, value));
        }
        Ok(call)
    }
}

fn named_option(arg: &FunctionArg) -> EngineResult<(String, OptionValue)> {
    match arg {
        FunctionArg::Named {
            name,
            arg: FunctionArgExpr::Expr(value),
            ..
        } => Ok((name.value.to_ascii_lowercase(), OptionValue::from_expr(value)?)),
        FunctionArg::ExprNamed {
            name: Expr::Identifier(name),
            arg: FunctionArgExpr::Expr(value),
            ..
        } => Ok((name.value.to_ascii_lowercase(), OptionValue::from_expr(value)?)),
        // GenericDialect reads `key = value` as a comparison.
        FunctionArg::Unnamed(FunctionArgExpr::Expr(Expr::BinaryOp {
            left,
            op: BinaryOperator::Eq,
            right,
        })) => match left.as_ref() {
            Expr::Identifier(name) => {
                Ok((name.value.to_ascii_lowercase(), OptionValue::from_expr(right)?))
            }
            other => Err(invalid(&format!("invalid option name {}", other))),
        },
        FunctionArg::Unnamed(FunctionArgExpr::Expr(Expr::Identifier(flag))) => {
            Ok((flag.value.to_ascii_lowercase(), OptionValue::Bool(true)))
        }
        other => Err(invalid(&format!("invalid option '{}'", other))),
    }
}

/// `COPY (<query>) TO '<target>' (<options>)`
#[derive(Debug, Clone, PartialEq)]
pub struct CopyStatement {
    pub query: String,
    pub target: String,
    pub options: CopyOptions,
}

impl CopyStatement {
    pub fn to_sql(&self) -> String {
        format!(
            "COPY ({}) TO {} ({})",
            self.query,
            escape_sql_string(&self.target),
            self.options.to_sql()
        )
    }
}

/// Build `CREATE OR REPLACE TEMPORARY VIEW <name> AS SELECT * FROM <read call>`.
pub fn create_view_sql(relation_name: &str, read: &ReadCall) -> String {
    format!(
        "CREATE OR REPLACE TEMPORARY VIEW {} AS SELECT * FROM {}",
        format_identifier_for_sql(relation_name),
        read.to_sql()
    )
}

/// Build `DESCRIBE SELECT * FROM <read call>`.
pub fn describe_read_sql(read: &ReadCall) -> String {
    format!("DESCRIBE SELECT * FROM {}", read.to_sql())
}

/// Trim whitespace and any trailing `;` terminators.
pub fn strip_terminators(sql: &str) -> &str {
    let mut text = sql.trim();
    while let Some(stripped) = text.strip_suffix(';') {
        text = stripped.trim_end();
    }
    text
}

pub fn parse(sql: &str) -> EngineResult<Statement> {
    let text = strip_terminators(sql);
    let dialect = GenericDialect {};
    let mut parser = Parser::new(&dialect).try_with_sql(text)?;

    // sqlparser's COPY grammar has no COMPRESSION option.
    if parser.parse_keyword(Keyword::COPY) {
        return parse_copy(&mut parser).map(Statement::Copy);
    }

    let mut statements = parser.parse_statements()?;
    if statements.len() != 1 {
        return Err(invalid(&format!(
            "expected exactly one statement, got {}",
            statements.len()
        )));
    }
    classify(statements.remove(0), text)
}

fn classify(statement: ast::Statement, text: &str) -> EngineResult<Statement> {
    match statement {
        ast::Statement::Query(query) => Ok(Statement::Query(query)),
        ast::Statement::CreateView {
            name,
            query,
            or_replace,
            if_not_exists,
            ..
        } => Ok(Statement::CreateView {
            name: relation_name(&name)?,
            or_replace,
            if_not_exists,
            query,
        }),
        ast::Statement::CreateTable(create) => match create.query {
            Some(query) => Ok(Statement::CreateView {
                name: relation_name(&create.name)?,
                or_replace: create.or_replace,
                if_not_exists: create.if_not_exists,
                query,
            }),
            // Column-list DDL is left to SQLContext.
            None => Ok(Statement::Other(text.to_string())),
        },
        ast::Statement::ExplainTable {
            describe_alias: DescribeAlias::Describe | DescribeAlias::Desc,
            table_name,
            ..
        } => Ok(Statement::Describe(DescribeTarget::Relation(
            relation_name(&table_name)?,
        ))),
        ast::Statement::Explain {
            describe_alias: DescribeAlias::Describe | DescribeAlias::Desc,
            statement,
            ..
        } => match *statement {
            ast::Statement::Query(query) => Ok(Statement::Describe(DescribeTarget::Query(query))),
            _ => Err(invalid("DESCRIBE expects a relation name or a query")),
        },
        ast::Statement::Drop {
            object_type: ObjectType::Table | ObjectType::View,
            if_exists,
            names,
            ..
        } => match names.as_slice() {
            [name] => Ok(Statement::Drop {
                name: relation_name(name)?,
                if_exists,
            }),
            _ => Err(invalid("DROP accepts a single relation")),
        },
        _ => Ok(Statement::Other(text.to_string())),
    }
}

fn relation_name(name: &ObjectName) -> EngineResult<String> {
    match name.0.as_slice() {
        [ident] => Ok(ident.value.clone()),
        _ => Err(invalid(&format!(
            "qualified relation names are not supported: {}",
            name
        ))),
    }
}

/// The tokens after `COPY`.
fn parse_copy(parser: &mut Parser<'_>) -> EngineResult<CopyStatement> {
    if !parser.consume_token(&Token::LParen) {
        return Err(invalid("COPY expects a parenthesized query"));
    }
    let query = parser.parse_query()?;
    parser.expect_token(&Token::RParen)?;
    parser.expect_keyword(Keyword::TO)?;
    let target = match parser.next_token().token {
        Token::SingleQuotedString(path) => path,
        _ => return Err(invalid("COPY target must be a quoted path")),
    };
    let _ = parser.parse_keyword(Keyword::WITH);
    let options = if parser.consume_token(&Token::LParen) {
        let options = parser.parse_comma_separated(parse_copy_option)?;
        parser.expect_token(&Token::RParen)?;
        options
    } else {
        Vec::new()
    };
    if parser.peek_token().token != Token::EOF {
        return Err(invalid("unexpected text after COPY options"));
    }
    Ok(CopyStatement {
        query: query.to_string(),
        target,
        options: CopyOptions::from_named(&options)?,
    })
}

/// `KEY [=] value` or a bare `KEY` flag.
fn parse_copy_option(parser: &mut Parser<'_>) -> Result<(String, OptionValue), ParserError> {
    let key = parser.parse_identifier(false)?.value.to_ascii_lowercase();
    let _ = parser.consume_token(&Token::Eq);
    let value = match parser.peek_token().token {
        Token::Comma | Token::RParen => OptionValue::Bool(true),
        Token::Word(word) => {
            parser.next_token();
            match word.keyword {
                Keyword::TRUE => OptionValue::Bool(true),
                Keyword::FALSE => OptionValue::Bool(false),
                _ => OptionValue::Word(word.value),
            }
        }
        _ => match parser.parse_value()? {
            Value::SingleQuotedString(s) => OptionValue::Str(s),
            Value::Boolean(b) => OptionValue::Bool(b),
            Value::Number(n, _) => n.parse().map(OptionValue::Int).map_err(|_| {
                ParserError::ParserError(format!("expected an integer for {}, got {}", key, n))
            })?,
            other => {
                return Err(ParserError::ParserError(format!(
                    "unsupported value {} for {}",
                    other, key
                )))
            }
        },
    };
    Ok((key, value))
}

/// Replace every `read_*(...)` table function in `query` with a generated relation name.
///
/// Returns the generated names with the calls they stand for, in the order they appear.
pub fn rewrite_reads(query: &mut Query) -> EngineResult<Vec<(String, ReadCall)>> {
    let mut rewriter = ReadRewriter::default();
    rewriter.query(query)?;
    Ok(rewriter.found)
}

#[derive(Default)]
struct ReadRewriter {
    found: Vec<(String, ReadCall)>,
}

impl ReadRewriter {
    fn query(&mut self, query: &mut Query) -> EngineResult<()> {
        if let Some(with) = &mut query.with {
            for cte in &mut with.cte_tables {
                self.query(&mut cte.query)?;
            }
        }
        self.set_expr(&mut query.body)
    }

    fn set_expr(&mut self, body: &mut SetExpr) -> EngineResult<()> {
        match body {
            SetExpr::Select(select) => self.select(select),
            SetExpr::Query(query) => self.query(query),
            SetExpr::SetOperation { left, right, .. } => {
                self.set_expr(left)?;
                self.set_expr(right)
            }
            _ => Ok(()),
        }
    }

    fn select(&mut self, select: &mut Select) -> EngineResult<()> {
        for item in &mut select.projection {
            match item {
                SelectItem::UnnamedExpr(e) | SelectItem::ExprWithAlias { expr: e, .. } => {
                    self.expr(e)?
                }
                _ => {}
            }
        }
        for table in &mut select.from {
            self.table_with_joins(table)?;
        }
        if let Some(e) = &mut select.selection {
            self.expr(e)?;
        }
        if let Some(e) = &mut select.having {
            self.expr(e)?;
        }
        Ok(())
    }

    fn table_with_joins(&mut self, table: &mut TableWithJoins) -> EngineResult<()> {
        self.table_factor(&mut table.relation)?;
        for join in &mut table.joins {
            self.table_factor(&mut join.relation)?;
        }
        Ok(())
    }

    fn table_factor(&mut self, factor: &mut TableFactor) -> EngineResult<()> {
        match factor {
            TableFactor::Table {
                name,
                args: Some(args),
                alias,
                ..
            } => {
                let function = match name.0.as_slice() {
                    [ident] => ReadFunction::from_sql_name(&ident.value),
                    _ => None,
                };
                if let Some(function) = function {
                    let call = ReadCall::from_args(function, &args.args)?;
                    let alias = alias.take();
                    let relation = format!("{}{}", READ_RELATION_PREFIX, self.found.len());
                    *factor = relation_factor(&relation, alias);
                    self.found.push((relation, call));
                }
                Ok(())
            }
            TableFactor::Derived { subquery, .. } => self.query(subquery),
            TableFactor::NestedJoin {
                table_with_joins, ..
            } => self.table_with_joins(table_with_joins),
            _ => Ok(()),
        }
    }

    fn expr(&mut self, e: &mut Expr) -> EngineResult<()> {
        match e {
            Expr::Subquery(query) | Expr::Exists {
                subquery: query, ..
            } => self.query(query),
            Expr::InSubquery { expr, subquery, .. } => {
                self.expr(expr)?;
                self.query(subquery)
            }
            Expr::BinaryOp { left, right, .. } => {
                self.expr(left)?;
                self.expr(right)
            }
            Expr::UnaryOp { expr, .. }
            | Expr::Nested(expr)
            | Expr::IsNull(expr)
            | Expr::IsNotNull(expr) => self.expr(expr),
            Expr::Between {
                expr, low, high, ..
            } => {
                self.expr(expr)?;
                self.expr(low)?;
                self.expr(high)
            }
            Expr::InList { expr, list, .. } => {
                self.expr(expr)?;
                list.iter_mut().try_for_each(|item| self.expr(item))
            }
            Expr::Case {
                operand,
                conditions,
                results,
                else_result,
            } => {
                if let Some(operand) = operand {
                    self.expr(operand)?;
                }
                for item in conditions.iter_mut().chain(results.iter_mut()) {
                    self.expr(item)?;
                }
                match else_result {
                    Some(else_result) => self.expr(else_result),
                    None => Ok(()),
                }
            }
            _ => Ok(()),
        }
    }
}

fn relation_factor(relation: &str, alias: Option<TableAlias>) -> TableFactor {
    TableFactor::Table {
        name: ObjectName(vec![Ident::new(relation)]),
        alias,
        args: None,
        with_hints: Vec::new(),
        version: None,
        with_ordinality: false,
        partitions: Vec::new(),
        json_path: None,
    }
}

fn invalid(msg: &str) -> EngineError {
    EngineError::InvalidStatement(msg.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::copy::CopyFormat;

    fn query_of(sql: &str) -> Box<Query> {
        match parse(sql).unwrap() {
            Statement::Query(query) => query,
            other => panic!("unexpected statement {:?}", other),
        }
    }

    #[test]
    fn test_plain_select_is_a_query() {
        let mut query = query_of("SELECT a, b FROM t;");
        assert!(rewrite_reads(&mut query).unwrap().is_empty());
        assert_eq!(query.to_string(), "SELECT a, b FROM t");
    }

    #[test]
    fn test_create_view_over_read_function() {
        let sql = "CREATE OR REPLACE TEMPORARY VIEW \"my \"\"file\"\"\" AS SELECT * FROM read_csv('it''s.csv', header = true, delim = ';')";
        match parse(sql).unwrap() {
            Statement::CreateView {
                name,
                or_replace,
                if_not_exists,
                mut query,
            } => {
                assert_eq!(name, "my \"file\"");
                assert!(or_replace);
                assert!(!if_not_exists);
                let reads = rewrite_reads(&mut query).unwrap();
                assert_eq!(reads.len(), 1);
                let (relation, call) = &reads[0];
                assert_eq!(relation, "__tabq_read_0");
                assert_eq!(call.function, ReadFunction::Csv);
                assert_eq!(call.path, "it's.csv");
                assert_eq!(call.option("HEADER"), Some(&OptionValue::Bool(true)));
                assert_eq!(
                    call.option("delim"),
                    Some(&OptionValue::Str(";".to_string()))
                );
                assert_eq!(query.to_string(), "SELECT * FROM __tabq_read_0");
            }
            other => panic!("unexpected statement {:?}", other),
        }
    }

    #[test]
    fn test_create_view_over_query() {
        match parse("create view v as select a from t where a > 1").unwrap() {
            Statement::CreateView {
                name,
                or_replace,
                query,
                ..
            } => {
                assert_eq!(name, "v");
                assert!(!or_replace);
                assert_eq!(query.to_string(), "SELECT a FROM t WHERE a > 1");
            }
            other => panic!("unexpected statement {:?}", other),
        }
        assert!(matches!(
            parse("CREATE TABLE IF NOT EXISTS x AS SELECT 1 AS one").unwrap(),
            Statement::CreateView {
                if_not_exists: true,
                ..
            }
        ));
    }

    #[test]
    fn test_read_call_round_trips_through_sql() {
        let call = ReadCall::new(ReadFunction::Csv, "a'b.tsv")
            .with_option("delim", OptionValue::Str("\t".to_string()))
            .with_option("header", OptionValue::Bool(false))
            .with_option("skip", OptionValue::Int(2));
        match parse(&create_view_sql("a_b", &call)).unwrap() {
            Statement::CreateView { mut query, .. } => {
                let reads = rewrite_reads(&mut query).unwrap();
                assert_eq!(reads, vec![("__tabq_read_0".to_string(), call)]);
            }
            other => panic!("unexpected statement {:?}", other),
        }
    }

    #[test]
    fn test_reads_anywhere_in_a_query() {
        let sql = "-- people over thirty\n\
                   SELECT p.name FROM read_csv('people.csv') AS p \
                   JOIN read_parquet('teams.parquet') t ON p.team = t.id \
                   WHERE p.age > 30 AND p.city IN (SELECT city FROM read_ndjson('cities.jsonl'));";
        let mut query = query_of(sql);
        let reads = rewrite_reads(&mut query).unwrap();
        let paths: Vec<&str> = reads.iter().map(|(_, call)| call.path.as_str()).collect();
        assert_eq!(paths, vec!["people.csv", "teams.parquet", "cities.jsonl"]);
        let rewritten = query.to_string();
        assert!(rewritten.contains("FROM __tabq_read_0 AS p"));
        assert!(rewritten.contains("JOIN __tabq_read_1 AS t"));
        assert!(rewritten.contains("SELECT city FROM __tabq_read_2"));
        assert!(!rewritten.contains("read_"));
    }

    #[test]
    fn test_reads_in_ctes_and_unions() {
        let mut query = query_of(
            "WITH a AS (SELECT * FROM READ_JSON_AUTO('rows.json')) \
             SELECT * FROM a UNION ALL SELECT * FROM read_jsonl('more.jsonl')",
        );
        let reads = rewrite_reads(&mut query).unwrap();
        assert_eq!(reads.len(), 2);
        assert_eq!(reads[0].1.function, ReadFunction::Json);
        assert_eq!(reads[1].1.function, ReadFunction::Ndjson);
    }

    #[test]
    fn test_read_call_needs_a_quoted_path() {
        let mut query = query_of("SELECT * FROM read_csv(path_column)");
        assert!(matches!(
            rewrite_reads(&mut query),
            Err(EngineError::InvalidStatement(_))
        ));
    }

    #[test]
    fn test_other_table_functions_are_untouched() {
        let mut query = query_of("SELECT * FROM read_csvx('a')");
        assert!(rewrite_reads(&mut query).unwrap().is_empty());
        assert!(query.to_string().contains("read_csvx('a')"));
    }

    #[test]
    fn test_describe_variants() {
        assert_eq!(
            parse("DESCRIBE sales").unwrap(),
            Statement::Describe(DescribeTarget::Relation("sales".to_string()))
        );
        assert_eq!(
            parse("describe \"my table\";").unwrap(),
            Statement::Describe(DescribeTarget::Relation("my table".to_string()))
        );
        match parse("DESCRIBE SELECT * FROM read_parquet('x.parquet')").unwrap() {
            Statement::Describe(DescribeTarget::Query(mut query)) => {
                let reads = rewrite_reads(&mut query).unwrap();
                assert_eq!(reads[0].1.function, ReadFunction::Parquet);
                assert_eq!(reads[0].1.path, "x.parquet");
            }
            other => panic!("unexpected statement {:?}", other),
        }
    }

    #[test]
    fn test_drop() {
        assert_eq!(
            parse("DROP TABLE IF EXISTS t").unwrap(),
            Statement::Drop {
                name: "t".to_string(),
                if_exists: true
            }
        );
        assert_eq!(
            parse("drop view \"a b\"").unwrap(),
            Statement::Drop {
                name: "a b".to_string(),
                if_exists: false
            }
        );
        assert!(parse("DROP TABLE a, b").is_err());
    }

    #[test]
    fn test_copy() {
        let sql = "COPY (SELECT a, ')' AS p FROM t WHERE (a > 1)) TO 'out.csv' (FORMAT csv, HEADER, DELIMITER ';', COMPRESSION gzip)";
        match parse(sql).unwrap() {
            Statement::Copy(copy) => {
                assert!(copy.query.starts_with("SELECT a, ')' AS p FROM t"));
                assert_eq!(copy.target, "out.csv");
                assert_eq!(copy.options.format, CopyFormat::Csv);
                assert!(copy.options.header);
                assert_eq!(copy.options.delimiter, b';');
                assert_eq!(
                    copy.options.compression,
                    Some(crate::CompressionFormat::Gzip)
                );
            }
            other => panic!("unexpected statement {:?}", other),
        }
    }

    #[test]
    fn test_copy_errors() {
        assert!(parse("COPY t TO 'x'").is_err());
        assert!(parse("COPY (SELECT 1 TO 'x'").is_err());
        assert!(parse("COPY (SELECT 1) TO x").is_err());
        assert!(parse("COPY () TO 'x'").is_err());
        assert!(parse("COPY (SELECT 1) TO 'x' (FORMAT csv) trailing").is_err());
    }

    #[test]
    fn test_unparseable_and_multiple_statements() {
        assert!(matches!(parse("created_at"), Err(EngineError::Parse(_))));
        assert!(matches!(
            parse("SELECT 1; SELECT 2"),
            Err(EngineError::InvalidStatement(_))
        ));
    }

    #[test]
    fn test_strip_terminators() {
        assert_eq!(strip_terminators("  SELECT 1 ;; \n"), "SELECT 1");
        assert_eq!(strip_terminators(" ; "), "");
    }
}
