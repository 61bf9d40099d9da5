//! Owned SELECT builder and the executor seam.
//!
//! [`SelectQuery`] is the only query shape association loading needs: a
//! projection of qualified columns, a chain of inner joins, `IN` filters on
//! bind parameters and an optional ordering. Every column reference is
//! qualified with its relation or alias, so identically named attributes of
//! joined relations never shadow each other.

mod executor;

use crate::dialect::Dialect;
use crate::schema::QualifiedName;

pub use executor::{QueryExecutor, Tuple};

/// A projected column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectColumn {
    pub name: QualifiedName,
    pub alias: Option<String>,
}

impl SelectColumn {
    /// Key of this column in result tuples.
    pub fn output_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name.attribute)
    }
}

/// A relation in FROM or JOIN position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    pub relation: String,
    pub alias: Option<String>,
}

impl TableRef {
    pub fn new(relation: &str, alias: Option<&str>) -> Self {
        Self {
            relation: relation.to_string(),
            alias: alias.map(str::to_string),
        }
    }

    fn render(&self, dialect: Dialect) -> String {
        let table = dialect.quote_identifier(&self.relation);
        match &self.alias {
            // Oracle rejects AS before a table alias
            Some(alias) if dialect == Dialect::Oracle => {
                format!("{} {}", table, dialect.quote_identifier(alias))
            }
            Some(alias) => format!("{} AS {}", table, dialect.quote_identifier(alias)),
            None => table,
        }
    }
}

/// An inner join with equality conditions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Join {
    pub table: TableRef,
    pub on: Vec<(QualifiedName, QualifiedName)>,
}

/// A filter on bind parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// `column IN (p1, ..., pn)`. Matches nothing when `n` is zero.
    In { column: QualifiedName, count: usize },
    /// `column = p`
    Eq { column: QualifiedName },
}

impl Filter {
    fn param_count(&self) -> usize {
        match self {
            Filter::In { count, .. } => *count,
            Filter::Eq { .. } => 1,
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDir {
    #[default]
    Asc,
    Desc,
}

/// SELECT query builder.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[must_use = "builders have no effect until used"]
pub struct SelectQuery {
    from: Option<TableRef>,
    columns: Vec<SelectColumn>,
    joins: Vec<Join>,
    filters: Vec<Filter>,
    order_by: Vec<(QualifiedName, SortDir)>,
}

impl SelectQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from(mut self, relation: &str, alias: Option<&str>) -> Self {
        self.from = Some(TableRef::new(relation, alias));
        self
    }

    /// Project `name`, keyed by its attribute name in results.
    pub fn column(mut self, name: QualifiedName) -> Self {
        self.columns.push(SelectColumn { name, alias: None });
        self
    }

    /// Project `name` under `alias`.
    pub fn column_as(mut self, name: QualifiedName, alias: &str) -> Self {
        self.columns.push(SelectColumn {
            name,
            alias: Some(alias.to_string()),
        });
        self
    }

    pub fn join(
        mut self,
        relation: &str,
        alias: Option<&str>,
        on: Vec<(QualifiedName, QualifiedName)>,
    ) -> Self {
        self.joins.push(Join {
            table: TableRef::new(relation, alias),
            on,
        });
        self
    }

    pub fn where_in(mut self, column: QualifiedName, count: usize) -> Self {
        self.filters.push(Filter::In { column, count });
        self
    }

    pub fn where_eq(mut self, column: QualifiedName) -> Self {
        self.filters.push(Filter::Eq { column });
        self
    }

    pub fn order_by(mut self, column: QualifiedName, dir: SortDir) -> Self {
        self.order_by.push((column, dir));
        self
    }

    pub fn columns(&self) -> &[SelectColumn] {
        &self.columns
    }

    pub fn joins(&self) -> &[Join] {
        &self.joins
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    /// Number of bind parameters the rendered statement expects.
    pub fn param_count(&self) -> usize {
        self.filters.iter().map(Filter::param_count).sum()
    }

    /// Render the statement for `dialect`.
    pub fn to_sql(&self, dialect: Dialect) -> String {
        let column = |name: &QualifiedName| {
            format!(
                "{}.{}",
                dialect.quote_identifier(&name.relation),
                dialect.quote_identifier(&name.attribute)
            )
        };

        let mut sql = String::from("SELECT ");

        if self.columns.is_empty() {
            sql.push('*');
        } else {
            let projection: Vec<String> = self
                .columns
                .iter()
                .map(|c| match &c.alias {
                    Some(alias) => format!("{} AS {}", column(&c.name), dialect.quote_identifier(alias)),
                    None => column(&c.name),
                })
                .collect();
            sql.push_str(&projection.join(", "));
        }

        if let Some(from) = &self.from {
            sql.push_str(" FROM ");
            sql.push_str(&from.render(dialect));
        }

        for join in &self.joins {
            sql.push_str(" INNER JOIN ");
            sql.push_str(&join.table.render(dialect));
            let on: Vec<String> = join
                .on
                .iter()
                .map(|(l, r)| format!("{} = {}", column(l), column(r)))
                .collect();
            sql.push_str(" ON ");
            sql.push_str(&on.join(" AND "));
        }

        let mut param = 0;
        let conditions: Vec<String> = self
            .filters
            .iter()
            .map(|filter| match filter {
                Filter::In { count: 0, .. } => "1 = 0".to_string(),
                Filter::In { column: c, count } => {
                    let placeholders: Vec<String> = (0..*count)
                        .map(|_| {
                            param += 1;
                            dialect.placeholder(param)
                        })
                        .collect();
                    format!("{} IN ({})", column(c), placeholders.join(", "))
                }
                Filter::Eq { column: c } => {
                    param += 1;
                    format!("{} = {}", column(c), dialect.placeholder(param))
                }
            })
            .collect();
        if !conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }

        if !self.order_by.is_empty() {
            let order: Vec<String> = self
                .order_by
                .iter()
                .map(|(c, dir)| match dir {
                    SortDir::Asc => format!("{} ASC", column(c)),
                    SortDir::Desc => format!("{} DESC", column(c)),
                })
                .collect();
            sql.push_str(" ORDER BY ");
            sql.push_str(&order.join(", "));
        }

        sql
    }
}
