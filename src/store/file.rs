use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use rustc_hash::FxHashSet;

use super::ClusterStore;
use crate::error::{Result, TraceError};
use crate::types::{Lineage, LineageName, NodeId, Threshold};

/// Cell written where a lineage has fewer nodes than the longest one.
/// Distinct from every valid node id; empty cells are accepted as absent too.
pub const ABSENT_CELL: &str = "-";

/// Marker line opening each record of the reduced output.
pub const REDUCED_MARKER: &str = "Comp";

/// File-backed store rooted at an output prefix `P`:
///
/// - `P_<threshold>`: snapshot table, a header of lineage names followed by
///   rows of node ids, one column per lineage;
/// - `P_reduced`: `Comp` line then one node id per line, per finalized lineage;
/// - `P_meta`: event log, one line per event.
#[derive(Debug, Clone)]
pub struct FileStore {
    prefix: PathBuf,
}

impl FileStore {
    /// Start a fresh run: truncates any previous reduced output and event log.
    pub fn create(prefix: impl Into<PathBuf>) -> Result<Self> {
        let store = Self::open(prefix);
        for path in [store.reduced_path(), store.meta_path()] {
            File::create(&path).map_err(|e| TraceError::io(&path, e))?;
        }
        Ok(store)
    }

    /// Attach to an existing run; outputs are appended to.
    pub fn open(prefix: impl Into<PathBuf>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &Path {
        &self.prefix
    }

    pub fn snapshot_path(&self, threshold: Threshold) -> PathBuf {
        self.with_suffix(&threshold.to_string())
    }

    pub fn reduced_path(&self) -> PathBuf {
        self.with_suffix("reduced")
    }

    pub fn meta_path(&self) -> PathBuf {
        self.with_suffix("meta")
    }

    fn with_suffix(&self, suffix: &str) -> PathBuf {
        let mut name = OsString::from(self.prefix.as_os_str());
        name.push("_");
        name.push(suffix);
        PathBuf::from(name)
    }

    /// Node-id lists of every record in the reduced output, in file order.
    pub fn read_reduced(&self) -> Result<Vec<Vec<NodeId>>> {
        let path = self.reduced_path();
        let file = File::open(&path).map_err(|e| TraceError::io(&path, e))?;
        let invalid = |msg: String| TraceError::io(&path, io::Error::new(io::ErrorKind::InvalidData, msg));

        let mut records: Vec<Vec<NodeId>> = Vec::new();
        for (lineno, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(|e| TraceError::io(&path, e))?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if line == REDUCED_MARKER {
                records.push(Vec::new());
                continue;
            }
            let id = line
                .parse()
                .map_err(|_| invalid(format!("line {}: bad node id {line:?}", lineno + 1)))?;
            records
                .last_mut()
                .ok_or_else(|| invalid(format!("line {}: node id before first record", lineno + 1)))?
                .push(id);
        }
        Ok(records)
    }

    fn append_lines<I>(&self, path: &Path, lines: I) -> Result<()>
    where
        I: IntoIterator,
        I::Item: std::fmt::Display,
    {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| TraceError::io(path, e))?;
        let mut w = BufWriter::new(file);
        for line in lines {
            writeln!(w, "{line}").map_err(|e| TraceError::io(path, e))?;
        }
        w.flush().map_err(|e| TraceError::io(path, e))
    }
}

impl ClusterStore for FileStore {
    fn write_snapshot(&mut self, threshold: Threshold, lineages: &[Lineage]) -> Result<()> {
        let path = self.snapshot_path(threshold);
        let mut tmp = path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        let file = File::create(&tmp).map_err(|e| TraceError::io(&tmp, e))?;
        let mut w = BufWriter::new(file);
        write_snapshot_table(&mut w, lineages)
            .and_then(|()| w.flush())
            .map_err(|e| TraceError::io(&tmp, e))?;
        drop(w);
        // A snapshot becomes visible only once complete.
        fs::rename(&tmp, &path).map_err(|e| TraceError::io(&path, e))
    }

    fn read_snapshot(&self, threshold: Threshold) -> Result<Vec<Lineage>> {
        let path = self.snapshot_path(threshold);
        let file = File::open(&path).map_err(|e| {
            TraceError::snapshot(threshold, format!("{}: {e}", path.display()))
        })?;
        parse_snapshot_table(BufReader::new(file))
            .map_err(|reason| TraceError::snapshot(threshold, format!("{}: {reason}", path.display())))
    }

    fn append_reduced(
        &mut self,
        _lineage: &LineageName,
        nodes: &[NodeId],
        _size: usize,
        _last_threshold: Threshold,
    ) -> Result<()> {
        let path = self.reduced_path();
        let lines = std::iter::once(REDUCED_MARKER.to_owned())
            .chain(nodes.iter().map(NodeId::to_string));
        self.append_lines(&path, lines)
    }

    fn append_meta(&mut self, description: &str, _threshold: Threshold) -> Result<()> {
        let path = self.meta_path();
        self.append_lines(&path, [description])
    }
}

/// Write lineages as a ragged column table.
pub(crate) fn write_snapshot_table<W: Write>(w: &mut W, lineages: &[Lineage]) -> io::Result<()> {
    let header: Vec<&str> = lineages.iter().map(|l| l.name.as_str()).collect();
    writeln!(w, "{}", header.join(" "))?;

    let rows = lineages.iter().map(Lineage::len).max().unwrap_or(0);
    let mut line = String::new();
    for row in 0..rows {
        line.clear();
        for (col, lineage) in lineages.iter().enumerate() {
            if col > 0 {
                line.push(' ');
            }
            match lineage.nodes.get(row) {
                Some(id) => line.push_str(&id.to_string()),
                None => line.push_str(ABSENT_CELL),
            }
        }
        writeln!(w, "{line}")?;
    }
    Ok(())
}

/// Parse a ragged column table written by [`write_snapshot_table`].
///
/// Also accepts tables whose short columns are padded with empty cells and
/// whose lines end in `\r\n`.
pub(crate) fn parse_snapshot_table<R: BufRead>(reader: R) -> std::result::Result<Vec<Lineage>, String> {
    let mut lines = reader.lines();
    let header = match lines.next() {
        Some(line) => line.map_err(|e| e.to_string())?,
        None => return Err("missing header line".into()),
    };

    let mut lineages: Vec<Lineage> = Vec::new();
    for token in header.split_whitespace() {
        let name = LineageName::parse(token).ok_or_else(|| format!("invalid lineage name {token:?}"))?;
        if lineages.iter().any(|l| l.name == name) {
            return Err(format!("duplicate lineage name {name}"));
        }
        lineages.push(Lineage::new(name, Vec::new()));
    }
    let mut ended = vec![false; lineages.len()];
    let mut seen: FxHashSet<NodeId> = FxHashSet::default();

    for (row, line) in lines.enumerate() {
        let line = line.map_err(|e| e.to_string())?;
        let line = line.trim_end_matches(['\r', '\n']);
        if line.is_empty() {
            continue;
        }
        let cells: Vec<&str> = line.split(' ').collect();
        if cells.len() > lineages.len() {
            return Err(format!(
                "row {} has {} cells for {} lineages",
                row + 1,
                cells.len(),
                lineages.len()
            ));
        }
        for (col, lineage) in lineages.iter_mut().enumerate() {
            let cell = cells.get(col).copied().unwrap_or("");
            if cell.is_empty() || cell == ABSENT_CELL {
                ended[col] = true;
                continue;
            }
            if ended[col] {
                return Err(format!(
                    "column {} resumes after a gap at row {}",
                    lineage.name,
                    row + 1
                ));
            }
            let id = cell
                .parse()
                .map_err(|_| format!("row {}: bad node id {cell:?}", row + 1))?;
            if !seen.insert(id) {
                return Err(format!("node {id} appears twice"));
            }
            lineage.nodes.push(id);
        }
    }
    Ok(lineages)
}
