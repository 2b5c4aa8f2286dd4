//! Expressions: column references, values, function calls and ordering.

use super::predicate::{Operand, WhereItem};
use super::Query;
use crate::raw::RawSql;
use crate::value::{SqlValue, ToSqlValue};

/// A SQL expression usable in select lists, predicates and function
/// arguments.
#[derive(Debug, Clone)]
pub enum Expr {
    /// Column reference: `name`, `alias.name`, `*` or `alias.*`.
    Column(String),
    /// A bound value.
    Value(SqlValue),
    /// Raw SQL with local parameters.
    Raw(RawSql),
    /// Function or aggregate call.
    Fn(Box<FnCall>),
    /// Parenthesized sub-query.
    SubQuery(Box<Query>),
}

/// Creates a column reference.
#[must_use]
pub fn col(name: &str) -> ColumnRef {
    ColumnRef {
        name: String::from(name),
    }
}

/// Creates a bound value expression.
#[must_use]
pub fn val<T: ToSqlValue>(value: T) -> Expr {
    Expr::Value(value.to_sql_value())
}

/// A column reference that builds predicates.
#[derive(Debug, Clone)]
pub struct ColumnRef {
    /// Column name, optionally prefixed by a table alias.
    pub name: String,
}

/// Conversion into an [`Expr`] where bare strings name columns.
pub trait IntoExpr {
    /// Converts into an expression.
    fn into_expr(self) -> Expr;
}

impl IntoExpr for Expr {
    fn into_expr(self) -> Expr {
        self
    }
}

impl IntoExpr for &str {
    fn into_expr(self) -> Expr {
        Expr::Column(String::from(self))
    }
}

impl IntoExpr for String {
    fn into_expr(self) -> Expr {
        Expr::Column(self)
    }
}

impl IntoExpr for ColumnRef {
    fn into_expr(self) -> Expr {
        Expr::Column(self.name)
    }
}

impl IntoExpr for FnCall {
    fn into_expr(self) -> Expr {
        Expr::Fn(Box::new(self))
    }
}

impl IntoExpr for RawSql {
    fn into_expr(self) -> Expr {
        Expr::Raw(self)
    }
}

impl IntoExpr for Query {
    fn into_expr(self) -> Expr {
        Expr::SubQuery(Box::new(self))
    }
}

/// Predicate builders shared by columns, function calls and expressions.
pub trait Compare: IntoExpr + Sized {
    /// `self = value`, or `IS NULL` when the value is NULL.
    #[must_use]
    fn eq(self, value: impl IntoOperand) -> WhereItem {
        WhereItem::compare(self.into_expr(), Op::Eq, value.into_operand())
    }

    /// `self <> value`, or `IS NOT NULL` when the value is NULL.
    #[must_use]
    fn not_eq(self, value: impl IntoOperand) -> WhereItem {
        WhereItem::compare(self.into_expr(), Op::NotEq, value.into_operand())
    }

    /// `self < value`.
    #[must_use]
    fn lt(self, value: impl IntoOperand) -> WhereItem {
        WhereItem::compare(self.into_expr(), Op::Lt, value.into_operand())
    }

    /// `self <= value`.
    #[must_use]
    fn lt_eq(self, value: impl IntoOperand) -> WhereItem {
        WhereItem::compare(self.into_expr(), Op::LtEq, value.into_operand())
    }

    /// `self > value`.
    #[must_use]
    fn gt(self, value: impl IntoOperand) -> WhereItem {
        WhereItem::compare(self.into_expr(), Op::Gt, value.into_operand())
    }

    /// `self >= value`.
    #[must_use]
    fn gt_eq(self, value: impl IntoOperand) -> WhereItem {
        WhereItem::compare(self.into_expr(), Op::GtEq, value.into_operand())
    }

    /// `self IS NULL`.
    #[must_use]
    fn is_null(self) -> WhereItem {
        self.eq(SqlValue::Null)
    }

    /// `self IS NOT NULL`.
    #[must_use]
    fn is_not_null(self) -> WhereItem {
        self.not_eq(SqlValue::Null)
    }

    /// `self IN (...)`. An empty list never matches.
    #[must_use]
    fn in_list<T: ToSqlValue>(self, values: impl IntoIterator<Item = T>) -> WhereItem {
        let values = values.into_iter().map(ToSqlValue::to_sql_value).collect();
        WhereItem::compare(self.into_expr(), Op::In, Operand::List(values))
    }

    /// `self NOT IN (...)`. An empty list always matches.
    #[must_use]
    fn not_in_list<T: ToSqlValue>(self, values: impl IntoIterator<Item = T>) -> WhereItem {
        let values = values.into_iter().map(ToSqlValue::to_sql_value).collect();
        WhereItem::compare(self.into_expr(), Op::NotIn, Operand::List(values))
    }

    /// `self IN (sub-query)`.
    #[must_use]
    fn in_query(self, query: Query) -> WhereItem {
        WhereItem::compare(self.into_expr(), Op::In, Operand::SubQuery(Box::new(query)))
    }

    /// `self LIKE pattern`.
    #[must_use]
    fn like(self, pattern: impl IntoOperand) -> WhereItem {
        WhereItem::compare(self.into_expr(), Op::Like, pattern.into_operand())
    }

    /// `self ILIKE pattern`.
    #[must_use]
    fn ilike(self, pattern: impl IntoOperand) -> WhereItem {
        WhereItem::compare(self.into_expr(), Op::ILike, pattern.into_operand())
    }

    /// Substring match.
    #[must_use]
    fn contains(self, value: impl IntoOperand) -> WhereItem {
        WhereItem::compare(self.into_expr(), Op::Contains, value.into_operand())
    }

    /// Case-insensitive substring match.
    #[must_use]
    fn contains_insensitive(self, value: impl IntoOperand) -> WhereItem {
        WhereItem::compare(
            self.into_expr(),
            Op::ContainsInsensitive,
            value.into_operand(),
        )
    }

    /// Prefix match.
    #[must_use]
    fn starts_with(self, value: impl IntoOperand) -> WhereItem {
        WhereItem::compare(self.into_expr(), Op::StartsWith, value.into_operand())
    }

    /// Suffix match.
    #[must_use]
    fn ends_with(self, value: impl IntoOperand) -> WhereItem {
        WhereItem::compare(self.into_expr(), Op::EndsWith, value.into_operand())
    }

    /// `self BETWEEN low AND high`.
    #[must_use]
    fn between<T: ToSqlValue, U: ToSqlValue>(self, low: T, high: U) -> WhereItem {
        WhereItem::compare(
            self.into_expr(),
            Op::Between,
            Operand::Range(low.to_sql_value(), high.to_sql_value()),
        )
    }
}

impl Compare for ColumnRef {}
impl Compare for FnCall {}
impl Compare for Expr {}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    /// `=`
    Eq,
    /// `<>`
    NotEq,
    /// `<`
    Lt,
    /// `<=`
    LtEq,
    /// `>`
    Gt,
    /// `>=`
    GtEq,
    /// `IN`
    In,
    /// `NOT IN`
    NotIn,
    /// `LIKE`
    Like,
    /// `ILIKE`
    ILike,
    /// `LIKE '%' || v || '%'`
    Contains,
    /// `ILIKE '%' || v || '%'`
    ContainsInsensitive,
    /// `LIKE v || '%'`
    StartsWith,
    /// `LIKE '%' || v`
    EndsWith,
    /// `BETWEEN`
    Between,
}

impl Op {
    /// Returns the SQL operator for binary comparisons.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::NotEq => "<>",
            Self::Lt => "<",
            Self::LtEq => "<=",
            Self::Gt => ">",
            Self::GtEq => ">=",
            Self::In => "IN",
            Self::NotIn => "NOT IN",
            Self::Like | Self::Contains | Self::StartsWith | Self::EndsWith => "LIKE",
            Self::ILike | Self::ContainsInsensitive => "ILIKE",
            Self::Between => "BETWEEN",
        }
    }
}

/// Conversion into the right-hand side of a comparison.
pub trait IntoOperand {
    /// Converts into an operand.
    fn into_operand(self) -> Operand;
}

impl<T: ToSqlValue> IntoOperand for T {
    fn into_operand(self) -> Operand {
        Operand::Value(self.to_sql_value())
    }
}

impl IntoOperand for ColumnRef {
    fn into_operand(self) -> Operand {
        Operand::Column(self.name)
    }
}

impl IntoOperand for RawSql {
    fn into_operand(self) -> Operand {
        Operand::Raw(self)
    }
}

impl IntoOperand for Query {
    fn into_operand(self) -> Operand {
        Operand::SubQuery(Box::new(self))
    }
}

/// A function or aggregate call.
///
/// Renders as `name([DISTINCT] args [ORDER BY ..]) [FILTER (WHERE ..)] [OVER ..]`.
#[derive(Debug, Clone)]
pub struct FnCall {
    /// Function name, emitted as written.
    pub name: String,
    /// Arguments.
    pub args: Vec<Expr>,
    /// `DISTINCT` inside the argument list.
    pub distinct: bool,
    /// `ORDER BY` inside the argument list.
    pub order: Vec<OrderItem>,
    /// `FILTER (WHERE ..)` conditions, joined with AND.
    pub filter: Vec<WhereItem>,
    /// `OVER` window.
    pub over: Option<Over>,
}

/// The window of a window-function call.
#[derive(Debug, Clone)]
pub enum Over {
    /// Reference to a window declared with `Query::window`.
    Named(String),
    /// Inline window specification.
    Spec(WindowSpec),
}

/// `PARTITION BY` / `ORDER BY` window specification.
#[derive(Debug, Clone, Default)]
pub struct WindowSpec {
    /// Partition expressions.
    pub partition_by: Vec<Expr>,
    /// Ordering inside the partition.
    pub order: Vec<OrderItem>,
}

impl WindowSpec {
    /// Creates an empty window.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a partition expression.
    #[must_use]
    pub fn partition_by(mut self, expr: impl IntoExpr) -> Self {
        self.partition_by.push(expr.into_expr());
        self
    }

    /// Adds an ordering term.
    #[must_use]
    pub fn order_by(mut self, item: impl Into<OrderItem>) -> Self {
        self.order.push(item.into());
        self
    }
}

impl FnCall {
    /// Creates a call with the given arguments.
    #[must_use]
    pub fn new<A: IntoExpr>(name: impl Into<String>, args: impl IntoIterator<Item = A>) -> Self {
        Self {
            name: name.into(),
            args: args.into_iter().map(IntoExpr::into_expr).collect(),
            distinct: false,
            order: Vec::new(),
            filter: Vec::new(),
            over: None,
        }
    }

    /// Adds `DISTINCT` before the arguments.
    #[must_use]
    pub const fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    /// Orders the aggregated input.
    #[must_use]
    pub fn order_by(mut self, item: impl Into<OrderItem>) -> Self {
        self.order.push(item.into());
        self
    }

    /// Restricts aggregated rows with `FILTER (WHERE ..)`.
    #[must_use]
    pub fn filter(mut self, items: impl IntoIterator<Item = WhereItem>) -> Self {
        self.filter.extend(items);
        self
    }

    /// Turns the call into a window function over an inline window.
    #[must_use]
    pub fn over(mut self, spec: WindowSpec) -> Self {
        self.over = Some(Over::Spec(spec));
        self
    }

    /// Turns the call into a window function over a named window.
    #[must_use]
    pub fn over_window(mut self, name: impl Into<String>) -> Self {
        self.over = Some(Over::Named(name.into()));
        self
    }
}

fn call1(name: &str, arg: impl IntoExpr) -> FnCall {
    FnCall::new(name, [arg.into_expr()])
}

/// `count(expr)`.
#[must_use]
pub fn count(expr: impl IntoExpr) -> FnCall {
    call1("count", expr)
}

/// `count(*)`.
#[must_use]
pub fn count_all() -> FnCall {
    FnCall::new("count", [Expr::Raw(RawSql::from("*"))])
}

/// `sum(expr)`.
#[must_use]
pub fn sum(expr: impl IntoExpr) -> FnCall {
    call1("sum", expr)
}

/// `avg(expr)`.
#[must_use]
pub fn avg(expr: impl IntoExpr) -> FnCall {
    call1("avg", expr)
}

/// `min(expr)`.
#[must_use]
pub fn min(expr: impl IntoExpr) -> FnCall {
    call1("min", expr)
}

/// `max(expr)`.
#[must_use]
pub fn max(expr: impl IntoExpr) -> FnCall {
    call1("max", expr)
}

/// `json_agg(expr)`.
#[must_use]
pub fn json_agg(expr: impl IntoExpr) -> FnCall {
    call1("json_agg", expr)
}

/// `array_agg(expr)`.
#[must_use]
pub fn array_agg(expr: impl IntoExpr) -> FnCall {
    call1("array_agg", expr)
}

/// `string_agg(expr, delimiter)`.
#[must_use]
pub fn string_agg(expr: impl IntoExpr, delimiter: &str) -> FnCall {
    FnCall::new("string_agg", [expr.into_expr(), val(delimiter)])
}

/// `bool_and(expr)`.
#[must_use]
pub fn bool_and(expr: impl IntoExpr) -> FnCall {
    call1("bool_and", expr)
}

/// `bool_or(expr)`.
#[must_use]
pub fn bool_or(expr: impl IntoExpr) -> FnCall {
    call1("bool_or", expr)
}

/// `row_number()`; pair with [`FnCall::over`].
#[must_use]
pub fn row_number() -> FnCall {
    FnCall::new("row_number", Vec::<Expr>::new())
}

/// `rank()`; pair with [`FnCall::over`].
#[must_use]
pub fn rank() -> FnCall {
    FnCall::new("rank", Vec::<Expr>::new())
}

/// `dense_rank()`; pair with [`FnCall::over`].
#[must_use]
pub fn dense_rank() -> FnCall {
    FnCall::new("dense_rank", Vec::<Expr>::new())
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    /// Ascending.
    #[default]
    Asc,
    /// Descending.
    Desc,
}

/// NULL placement for an ordering term.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nulls {
    /// `NULLS FIRST`
    First,
    /// `NULLS LAST`
    Last,
}

/// One `ORDER BY` term.
#[derive(Debug, Clone)]
pub struct OrderItem {
    /// Ordered expression.
    pub expr: Expr,
    /// Direction.
    pub direction: Direction,
    /// NULL placement.
    pub nulls: Option<Nulls>,
}

impl OrderItem {
    /// Puts NULLs first.
    #[must_use]
    pub const fn nulls_first(mut self) -> Self {
        self.nulls = Some(Nulls::First);
        self
    }

    /// Puts NULLs last.
    #[must_use]
    pub const fn nulls_last(mut self) -> Self {
        self.nulls = Some(Nulls::Last);
        self
    }
}

/// Ascending order on `expr`.
#[must_use]
pub fn asc(expr: impl IntoExpr) -> OrderItem {
    OrderItem {
        expr: expr.into_expr(),
        direction: Direction::Asc,
        nulls: None,
    }
}

/// Descending order on `expr`.
#[must_use]
pub fn desc(expr: impl IntoExpr) -> OrderItem {
    OrderItem {
        expr: expr.into_expr(),
        direction: Direction::Desc,
        nulls: None,
    }
}

impl From<&str> for OrderItem {
    fn from(column: &str) -> Self {
        asc(column)
    }
}

impl From<String> for OrderItem {
    fn from(column: String) -> Self {
        asc(column)
    }
}
