//! Project path hierarchy resolution.
//!
//! # Responsibility
//! - Map `_`/`/` delimited project paths to `projects` row ids.
//! - Create missing ancestors before their descendants.
//!
//! # Invariants
//! - A path's parent row exists before the path row references it.
//! - The path cache is owned by one resolver and dies with it; there is no
//!   process-wide cache.
//! - `get_id` for a path never preloaded is an error, not a silent miss.

use crate::db::DbError;
use log::debug;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::{BTreeSet, HashMap};
use std::error::Error;
use std::fmt::{Display, Formatter};

const PATH_DELIMITERS: &[char] = &['_', '/'];

/// Row id of one `projects` entry.
pub type ProjectId = i64;

pub type ProjectRepoResult<T> = Result<T, ProjectRepoError>;

#[derive(Debug)]
pub enum ProjectRepoError {
    Db(DbError),
    /// `get_id` was called for a path never passed to `preload_and_resolve`.
    Unresolved(String),
    /// Path is empty or has an empty segment.
    InvalidPath(String),
}

impl Display for ProjectRepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Unresolved(path) => {
                write!(f, "project path `{path}` was not preloaded in this batch")
            }
            Self::InvalidPath(path) => write!(f, "invalid project path `{path}`"),
        }
    }
}

impl Error for ProjectRepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Unresolved(_) | Self::InvalidPath(_) => None,
        }
    }
}

impl From<DbError> for ProjectRepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for ProjectRepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Persisted project hierarchy node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectNode {
    pub id: ProjectId,
    /// Last path segment.
    pub name: String,
    /// `None` for a top-level project.
    pub parent_id: Option<ProjectId>,
    pub full_path: String,
    /// `0` for a top-level project.
    pub depth: u32,
}

/// Splits `a_b_c` into its ancestor chain `[a, a_b, a_b_c]`.
pub fn ancestor_paths(path: &str) -> ProjectRepoResult<Vec<&str>> {
    if path.is_empty() {
        return Err(ProjectRepoError::InvalidPath(path.to_string()));
    }

    let mut chain = Vec::new();
    let mut segment_start = 0;
    for (index, ch) in path.char_indices() {
        if PATH_DELIMITERS.contains(&ch) {
            if index == segment_start {
                return Err(ProjectRepoError::InvalidPath(path.to_string()));
            }
            chain.push(&path[..index]);
            segment_start = index + ch.len_utf8();
        }
    }
    if segment_start == path.len() {
        return Err(ProjectRepoError::InvalidPath(path.to_string()));
    }
    chain.push(path);
    Ok(chain)
}

/// Batch-scoped path resolver.
///
/// Nodes live in an arena addressed by index; the cache maps a full path to
/// its arena index.
pub struct ProjectResolver<'conn> {
    conn: &'conn Connection,
    nodes: Vec<ProjectNode>,
    cache: HashMap<String, usize>,
    inserted: usize,
}

impl<'conn> ProjectResolver<'conn> {
    /// Creates an empty resolver over `conn` (usually an open transaction).
    pub fn new(conn: &'conn Connection) -> Self {
        Self {
            conn,
            nodes: Vec::new(),
            cache: HashMap::new(),
            inserted: 0,
        }
    }

    /// Resolves every distinct path and its ancestors, inserting missing rows.
    pub fn preload_and_resolve<'p>(
        &mut self,
        paths: impl IntoIterator<Item = &'p str>,
    ) -> ProjectRepoResult<()> {
        let distinct: BTreeSet<&str> = paths.into_iter().collect();
        for path in distinct {
            let mut parent: Option<usize> = None;
            for ancestor in ancestor_paths(path)? {
                let index = match self.cache.get(ancestor) {
                    Some(index) => *index,
                    None => self.resolve_one(ancestor, parent)?,
                };
                parent = Some(index);
            }
        }
        debug!(
            "event=project_preload module=repo status=ok cached={} inserted={}",
            self.cache.len(),
            self.inserted
        );
        Ok(())
    }

    /// Returns the id of a preloaded path.
    pub fn get_id(&self, path: &str) -> ProjectRepoResult<ProjectId> {
        self.cache
            .get(path)
            .map(|index| self.nodes[*index].id)
            .ok_or_else(|| ProjectRepoError::Unresolved(path.to_string()))
    }

    /// Nodes resolved so far, in resolution order.
    pub fn nodes(&self) -> &[ProjectNode] {
        &self.nodes
    }

    /// Number of rows inserted by this resolver.
    pub fn inserted_count(&self) -> usize {
        self.inserted
    }

    fn resolve_one(&mut self, full_path: &str, parent: Option<usize>) -> ProjectRepoResult<usize> {
        let node = match find_by_path(self.conn, full_path)? {
            Some(node) => node,
            None => {
                let parent_node = parent.map(|index| &self.nodes[index]);
                let node = ProjectNode {
                    id: 0,
                    name: last_segment(full_path).to_string(),
                    parent_id: parent_node.map(|node| node.id),
                    full_path: full_path.to_string(),
                    depth: parent_node.map_or(0, |node| node.depth + 1),
                };
                let id = insert_node(self.conn, &node)?;
                self.inserted += 1;
                ProjectNode { id, ..node }
            }
        };

        let index = self.nodes.len();
        self.cache.insert(node.full_path.clone(), index);
        self.nodes.push(node);
        Ok(index)
    }
}

fn last_segment(path: &str) -> &str {
    path.rsplit(PATH_DELIMITERS).next().unwrap_or(path)
}

fn find_by_path(conn: &Connection, full_path: &str) -> ProjectRepoResult<Option<ProjectNode>> {
    let mut stmt = conn.prepare_cached(
        "SELECT id, name, parent_id, full_path, depth
         FROM projects
         WHERE full_path = ?1;",
    )?;
    let node = stmt.query_row([full_path], parse_project_row).optional()?;
    Ok(node)
}

fn insert_node(conn: &Connection, node: &ProjectNode) -> ProjectRepoResult<ProjectId> {
    let mut stmt = conn.prepare_cached(
        "INSERT INTO projects (name, parent_id, full_path, depth)
         VALUES (?1, ?2, ?3, ?4);",
    )?;
    stmt.execute(params![
        node.name.as_str(),
        node.parent_id,
        node.full_path.as_str(),
        node.depth,
    ])?;
    Ok(conn.last_insert_rowid())
}

/// Lists every persisted project ordered by full path.
pub fn list_projects(conn: &Connection) -> ProjectRepoResult<Vec<ProjectNode>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, parent_id, full_path, depth
         FROM projects
         ORDER BY full_path ASC;",
    )?;
    let rows = stmt.query_map([], parse_project_row)?;
    let mut nodes = Vec::new();
    for row in rows {
        nodes.push(row?);
    }
    Ok(nodes)
}

fn parse_project_row(row: &Row<'_>) -> rusqlite::Result<ProjectNode> {
    Ok(ProjectNode {
        id: row.get("id")?,
        name: row.get("name")?,
        parent_id: row.get("parent_id")?,
        full_path: row.get("full_path")?,
        depth: row.get("depth")?,
    })
}
