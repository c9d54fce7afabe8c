//! Entity-agnostic CRUD over a table descriptor.
//!
//! Reads go through the same templates as list requests, so soft-deleted rows
//! never surface. Bulk deletes check every id first and only act when the whole
//! batch exists.

use crate::builder::{DeleteBuilder, InsertBuilder, UpdateBuilder};
use crate::config::EngineConfig;
use crate::dialect::SqlDialect;
use crate::exec::{ExecError, FromRow, Row, SqlExecutor, with_timeout};
use crate::filter::Composer;
use crate::pager::{PagingCoordinator, PagingError};
use crate::pagination::{PageEnvelope, PageRequest};
use crate::table::{MASTER_ALIAS, TableDescriptor};
use crate::template::{Clause, ClauseSet, Predicate, Template};
use crate::types::{QueryResult, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::marker::PhantomData;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Message recorded against each id a bulk operation could not find.
pub const NOT_FOUND: &str = "not found";

/// Errors from repository operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RepositoryError {
    /// No live row has this id.
    #[error("{entity} '{id}' not found")]
    NotFound { entity: String, id: String },

    /// Some ids of a bulk operation do not exist; nothing was changed.
    #[error("{} id(s) not found", .0.len())]
    MissingIds(BTreeMap<String, String>),

    /// Id-based operations need exactly one primary-key column.
    #[error("table '{0}' needs a single-column primary key for id-based operations")]
    CompositeKey(String),

    /// A list request failed.
    #[error(transparent)]
    Paging(#[from] PagingError),

    /// A statement failed or timed out.
    #[error(transparent)]
    Exec(#[from] ExecError),
}

/// A type stored in one table.
pub trait Entity: FromRow + Send + Sync + 'static {
    /// Table layout, joins and soft-delete column.
    fn descriptor() -> TableDescriptor;

    /// Primary-key value of this instance; `Value::Null` before insertion when
    /// the database assigns it.
    fn id(&self) -> Value;

    /// Column values to write, by unqualified column name.
    fn values(&self) -> Vec<(&'static str, Value)>;
}

/// CRUD operations for one entity type.
///
/// Cheap to clone; the executor and descriptor are shared.
#[derive(Debug)]
pub struct Repository<E, X: SqlExecutor> {
    executor: Arc<X>,
    config: EngineConfig,
    table: Arc<TableDescriptor>,
    _entity: PhantomData<fn() -> E>,
}

impl<E, X: SqlExecutor> Clone for Repository<E, X> {
    fn clone(&self) -> Self {
        Self {
            executor: Arc::clone(&self.executor),
            config: self.config.clone(),
            table: Arc::clone(&self.table),
            _entity: PhantomData,
        }
    }
}

impl<E: Entity, X: SqlExecutor> Repository<E, X> {
    /// Create a repository for `E`.
    pub fn new(executor: Arc<X>, config: EngineConfig) -> Self {
        Self {
            executor,
            config,
            table: Arc::new(E::descriptor()),
            _entity: PhantomData,
        }
    }

    /// The entity's table descriptor.
    pub fn table(&self) -> &TableDescriptor {
        &self.table
    }

    /// Serve a list request.
    pub async fn list(&self, request: &PageRequest) -> Result<PageEnvelope<E>, RepositoryError> {
        let coordinator = PagingCoordinator::new(self.executor.as_ref(), &self.config);
        Ok(coordinator.fetch_page(&self.table, request).await?)
    }

    /// Fetch one live row by id.
    ///
    /// With one-to-many joins the first joined row is returned.
    pub async fn get(&self, id: impl Into<Value>) -> Result<E, RepositoryError> {
        let id = id.into();
        let key = self.key_column()?;

        let mut clauses = self.live_clauses(self.table.select_list(), true);
        clauses.push(Clause::Where(Predicate::eq(
            format!("{MASTER_ALIAS}.{key}"),
            id.clone(),
        )));
        let query = self.template().render(&clauses);

        let rows = self.run_fetch(&query).await?;
        let row = rows.first().ok_or_else(|| self.not_found(&id))?;
        Ok(E::from_row(row)?)
    }

    /// Insert `entity`, returning the number of rows written.
    ///
    /// Null primary-key values are left to the database; the soft-delete flag
    /// is initialized to live when the entity does not set it.
    pub async fn create(&self, entity: &E) -> Result<u64, RepositoryError> {
        let query = InsertBuilder::new(self.config.dialect, self.table.name())
            .row(self.insert_pairs(entity))
            .build();
        let written = self.run_execute(&query).await?;
        debug!(table = self.table.name(), written, "created row");
        Ok(written)
    }

    /// Insert several entities, one multi-row statement per run of entities
    /// that write the same columns.
    pub async fn create_many(&self, entities: &[E]) -> Result<u64, RepositoryError> {
        let mut batches: Vec<(Vec<&str>, Vec<Vec<Value>>)> = Vec::new();
        for entity in entities {
            let (columns, values): (Vec<&str>, Vec<Value>) =
                self.insert_pairs(entity).into_iter().unzip();
            match batches.last_mut() {
                Some((cols, rows)) if *cols == columns => rows.push(values),
                _ => batches.push((columns, vec![values])),
            }
        }

        let mut written = 0;
        for (columns, rows) in &batches {
            let query = rows
                .iter()
                .fold(
                    InsertBuilder::new(self.config.dialect, self.table.name()).columns(columns),
                    |builder, row| builder.values(row.clone()),
                )
                .build();
            written += self.run_execute(&query).await?;
        }
        debug!(
            table = self.table.name(),
            written,
            statements = batches.len(),
            "created rows"
        );
        Ok(written)
    }

    /// Write every non-key column of `entity` to its live row.
    pub async fn update(&self, entity: &E) -> Result<u64, RepositoryError> {
        let key = self.key_column()?;
        let id = entity.id();
        let flag = self.table.soft_delete_column();
        let pairs: Vec<(&str, Value)> = entity
            .values()
            .into_iter()
            .filter(|(col, _)| *col != key && Some(*col) != flag)
            .collect();

        let mut builder = UpdateBuilder::new(self.config.dialect, self.table.name())
            .set_many(pairs)
            .where_eq(key, id.clone());
        if let Some(flag) = flag {
            builder = builder.filter(Predicate::not_deleted(flag));
        }

        match self.run_execute(&builder.build()).await? {
            0 => Err(self.not_found(&id)),
            n => Ok(n),
        }
    }

    /// Delete one row: flag it when the table soft-deletes, remove it otherwise.
    pub async fn delete(&self, id: impl Into<Value>) -> Result<(), RepositoryError> {
        let id = id.into();
        let key = self.key_column()?;
        let query = self.delete_query(Predicate::eq(key, id.clone()));

        match self.run_execute(&query).await? {
            0 => Err(self.not_found(&id)),
            _ => Ok(()),
        }
    }

    /// Delete every row in `ids`, or none of them.
    ///
    /// Existence is checked first; if any id is missing the full set of
    /// missing ids is returned and nothing is deleted.
    pub async fn delete_many(&self, ids: &[Value]) -> Result<u64, RepositoryError> {
        let key = self.key_column()?;
        if ids.is_empty() {
            return Ok(0);
        }

        let qualified = format!("{MASTER_ALIAS}.{key}");
        let mut clauses = self.live_clauses(vec![qualified.clone()], false);
        clauses.push(Clause::Where(Predicate::is_in(qualified, ids.to_vec())));
        let lookup = self.template().render(&clauses);

        let found: BTreeSet<String> = self
            .run_fetch(&lookup)
            .await?
            .iter()
            .filter_map(|row| row.first().map(ToString::to_string))
            .collect();
        let missing: BTreeMap<String, String> = ids
            .iter()
            .map(ToString::to_string)
            .filter(|id| !found.contains(id))
            .map(|id| (id, NOT_FOUND.to_string()))
            .collect();
        if !missing.is_empty() {
            info!(
                table = self.table.name(),
                requested = ids.len(),
                missing = missing.len(),
                "bulk delete rejected"
            );
            return Err(RepositoryError::MissingIds(missing));
        }

        let query = self.delete_query(Predicate::is_in(key, ids.to_vec()));
        let deleted = self.run_execute(&query).await?;
        // The check and the delete are separate statements.
        let expected = u64::try_from(found.len()).unwrap_or(u64::MAX);
        if deleted < expected {
            warn!(
                table = self.table.name(),
                expected,
                deleted,
                "bulk delete changed fewer rows than were found; rows changed concurrently"
            );
        }
        info!(
            table = self.table.name(),
            deleted,
            soft = self.table.soft_delete_column().is_some(),
            "bulk delete applied"
        );
        Ok(deleted)
    }

    fn insert_pairs(&self, entity: &E) -> Vec<(&str, Value)> {
        let keys = self.table.primary_key_columns();
        let mut pairs: Vec<(&str, Value)> = entity
            .values()
            .into_iter()
            .filter(|(col, val)| !(val.is_null() && keys.iter().any(|k| k == col)))
            .collect();
        if let Some(flag) = self.table.soft_delete_column()
            && !pairs.iter().any(|(col, _)| *col == flag)
        {
            pairs.push((flag, Value::Int(0)));
        }
        pairs
    }

    fn template(&self) -> Template<'_, SqlDialect> {
        Template::new(self.config.dialect, &self.table)
    }

    fn key_column(&self) -> Result<&str, RepositoryError> {
        match self.table.primary_key_columns() {
            [key] => Ok(key),
            _ => Err(RepositoryError::CompositeKey(self.table.name().to_string())),
        }
    }

    fn live_clauses(&self, select: Vec<String>, with_joins: bool) -> ClauseSet {
        let mut clauses = ClauseSet::new().with(Clause::Select(select));
        if with_joins {
            clauses.extend(self.table.joins().iter().cloned().map(Clause::Join));
        }
        clauses.extend(
            Composer::new(&self.table)
                .base_predicates()
                .into_iter()
                .map(Clause::Where),
        );
        clauses
    }

    fn delete_query(&self, target: Predicate) -> QueryResult {
        match self.table.soft_delete_column() {
            Some(flag) => UpdateBuilder::new(self.config.dialect, self.table.name())
                .set(flag, Value::Int(1))
                .filter(target)
                .filter(Predicate::not_deleted(flag))
                .build(),
            None => DeleteBuilder::new(self.config.dialect, self.table.name())
                .filter(target)
                .build(),
        }
    }

    fn not_found(&self, id: &Value) -> RepositoryError {
        RepositoryError::NotFound {
            entity: self.table.name().to_string(),
            id: id.to_string(),
        }
    }

    async fn run_fetch(&self, query: &QueryResult) -> Result<Vec<Row>, ExecError> {
        with_timeout(self.config.query_timeout, self.executor.fetch_all(query)).await
    }

    async fn run_execute(&self, query: &QueryResult) -> Result<u64, ExecError> {
        with_timeout(self.config.query_timeout, self.executor.execute(query)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Debug)]
    struct Tag {
        id: i64,
        name: String,
    }

    impl FromRow for Tag {
        fn from_row(row: &Row) -> Result<Self, ExecError> {
            Ok(Self {
                id: row.get_i64("Id")?,
                name: row.get_string("Name")?.unwrap_or_default(),
            })
        }
    }

    impl Entity for Tag {
        fn descriptor() -> TableDescriptor {
            TableDescriptor::new("Tag")
                .columns(&["t1.Id", "t1.Name"])
                .primary_keys(&["Id"])
                .soft_delete("IsDeleted")
        }

        fn id(&self) -> Value {
            Value::Int(self.id)
        }

        fn values(&self) -> Vec<(&'static str, Value)> {
            vec![("Id", Value::Int(self.id)), ("Name", Value::from(self.name.as_str()))]
        }
    }

    /// Answers lookups with fixed rows and records every statement.
    struct Recorder {
        rows: Vec<Row>,
        affected: u64,
        seen: Mutex<Vec<QueryResult>>,
    }

    impl Recorder {
        fn new(ids: &[i64], affected: u64) -> Arc<Self> {
            Arc::new(Self {
                rows: ids
                    .iter()
                    .map(|id| Row::new(vec![("Id".into(), Value::Int(*id)), ("Name".into(), Value::from("x"))]))
                    .collect(),
                affected,
                seen: Mutex::new(Vec::new()),
            })
        }

        fn seen(&self) -> Vec<QueryResult> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl SqlExecutor for Recorder {
        async fn fetch_all(&self, query: &QueryResult) -> Result<Vec<Row>, ExecError> {
            self.seen.lock().unwrap().push(query.clone());
            Ok(self.rows.clone())
        }

        async fn execute(&self, query: &QueryResult) -> Result<u64, ExecError> {
            self.seen.lock().unwrap().push(query.clone());
            Ok(self.affected)
        }
    }

    fn repo(executor: &Arc<Recorder>) -> Repository<Tag, Recorder> {
        Repository::new(Arc::clone(executor), EngineConfig::default())
    }

    #[tokio::test]
    async fn test_get_filters_soft_deleted() {
        let executor = Recorder::new(&[4], 0);
        let tag = repo(&executor).get(4).await.unwrap();
        assert_eq!(tag.id, 4);

        let seen = executor.seen();
        assert_eq!(
            seen[0].sql,
            "SELECT t1.Id, t1.Name FROM Tag t1 WHERE t1.IsDeleted = 0 AND t1.Id = ?"
        );
        assert_eq!(seen[0].params, vec![Value::Int(4)]);
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let executor = Recorder::new(&[], 0);
        let err = repo(&executor).get(9).await.unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound { ref id, .. } if id == "9"));
    }

    #[tokio::test]
    async fn test_create_sets_live_flag() {
        let executor = Recorder::new(&[], 1);
        let tag = Tag {
            id: 5,
            name: "red".into(),
        };
        assert_eq!(repo(&executor).create(&tag).await.unwrap(), 1);
        assert_eq!(
            executor.seen()[0].sql,
            "INSERT INTO Tag (Id, Name, IsDeleted) VALUES (?, ?, ?)"
        );
    }

    #[tokio::test]
    async fn test_update_skips_key_and_requires_live_row() {
        let executor = Recorder::new(&[], 0);
        let tag = Tag {
            id: 5,
            name: "blue".into(),
        };
        let err = repo(&executor).update(&tag).await.unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound { .. }));
        assert_eq!(
            executor.seen()[0].sql,
            "UPDATE Tag SET Name = ? WHERE Id = ? AND IsDeleted = 0"
        );
    }

    #[tokio::test]
    async fn test_delete_is_soft() {
        let executor = Recorder::new(&[], 1);
        repo(&executor).delete(3).await.unwrap();
        let seen = executor.seen();
        assert_eq!(seen[0].sql, "UPDATE Tag SET IsDeleted = ? WHERE Id = ? AND IsDeleted = 0");
        assert_eq!(seen[0].params, vec![Value::Int(1), Value::Int(3)]);
    }

    #[tokio::test]
    async fn test_delete_many_all_or_nothing() {
        let executor = Recorder::new(&[1, 3], 2);
        let ids = [Value::Int(1), Value::Int(2), Value::Int(3)];
        let err = repo(&executor).delete_many(&ids).await.unwrap_err();

        let RepositoryError::MissingIds(missing) = err else {
            panic!("expected missing ids");
        };
        assert_eq!(missing.len(), 1);
        assert_eq!(missing.get("2").map(String::as_str), Some(NOT_FOUND));

        let seen = executor.seen();
        assert_eq!(seen.len(), 1);
        assert_eq!(
            seen[0].sql,
            "SELECT t1.Id FROM Tag t1 WHERE t1.IsDeleted = 0 AND t1.Id IN (?, ?, ?)"
        );
    }

    #[tokio::test]
    async fn test_delete_many_applies_when_all_exist() {
        let executor = Recorder::new(&[1, 3], 2);
        let deleted = repo(&executor)
            .delete_many(&[Value::Int(1), Value::Int(3)])
            .await
            .unwrap();
        assert_eq!(deleted, 2);

        let seen = executor.seen();
        assert_eq!(seen.len(), 2);
        assert_eq!(
            seen[1].sql,
            "UPDATE Tag SET IsDeleted = ? WHERE Id IN (?, ?) AND IsDeleted = 0"
        );
    }

    #[tokio::test]
    async fn test_delete_many_reports_short_delete() {
        // Both ids pass the check but only one row changes.
        let executor = Recorder::new(&[1, 3], 1);
        let deleted = repo(&executor)
            .delete_many(&[Value::Int(1), Value::Int(3), Value::Int(3)])
            .await
            .unwrap();
        assert_eq!(deleted, 1);
        assert_eq!(executor.seen().len(), 2);
    }

    #[tokio::test]
    async fn test_create_many_batches_by_columns() {
        let executor = Recorder::new(&[], 2);
        let tags = [
            Tag {
                id: 1,
                name: "red".into(),
            },
            Tag {
                id: 2,
                name: "blue".into(),
            },
        ];
        assert_eq!(repo(&executor).create_many(&tags).await.unwrap(), 2);

        let seen = executor.seen();
        assert_eq!(seen.len(), 1);
        assert_eq!(
            seen[0].sql,
            "INSERT INTO Tag (Id, Name, IsDeleted) VALUES (?, ?, ?), (?, ?, ?)"
        );
        assert_eq!(seen[0].params.len(), 6);

        let oracle = Repository::<Tag, Recorder>::new(
            Arc::clone(&executor),
            EngineConfig::new(SqlDialect::Oracle),
        );
        oracle.create_many(&tags).await.unwrap();
        assert_eq!(
            executor.seen()[1].sql,
            "INSERT ALL INTO Tag (Id, Name, IsDeleted) VALUES (:1, :2, :3) \
             INTO Tag (Id, Name, IsDeleted) VALUES (:4, :5, :6) SELECT 1 FROM DUAL"
        );

        assert_eq!(repo(&executor).create_many(&[]).await.unwrap(), 0);
        assert_eq!(executor.seen().len(), 2);
    }

    #[tokio::test]
    async fn test_composite_key_rejected() {
        struct Link;
        impl FromRow for Link {
            fn from_row(_row: &Row) -> Result<Self, ExecError> {
                Ok(Self)
            }
        }
        impl Entity for Link {
            fn descriptor() -> TableDescriptor {
                TableDescriptor::new("Link").primary_keys(&["A", "B"])
            }
            fn id(&self) -> Value {
                Value::Null
            }
            fn values(&self) -> Vec<(&'static str, Value)> {
                Vec::new()
            }
        }

        let executor = Recorder::new(&[], 0);
        let repo: Repository<Link, Recorder> = Repository::new(executor, EngineConfig::default());
        assert!(matches!(repo.delete(1).await, Err(RepositoryError::CompositeKey(_))));
    }
}
