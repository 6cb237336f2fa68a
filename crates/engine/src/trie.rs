use log::warn;

use crate::index::FileId;

/// Sentinel child index: "no child". Slot 0 is the root, which is never a
/// child of anything, so 0 is free to act as the null index.
const NO_CHILD: u32 = 0;

/// Reserved child slot holding the run-compressed edge of a node.
const RUN_SLOT: usize = 0xFF;

struct Node {
    /// Byte this node's incoming edge matches.
    key: u8,
    /// For run nodes: how many repetitions of `key` the edge consumes.
    /// Zero for plain single-byte edges.
    run_len: u32,
    terminal: bool,
    file_id: FileId,
    children: Box<[u32; 256]>,
}

impl Node {
    fn new(key: u8, run_len: u32) -> Self {
        Node {
            key,
            run_len,
            terminal: false,
            file_id: crate::index::INVALID_FILE_ID,
            children: Box::new([NO_CHILD; 256]),
        }
    }
}

/// Arena-backed byte trie with run-length path compression.
///
/// 256-way fanout per node; children are u32 indices into a flat node
/// vector. Runs of two or more identical bytes collapse onto a single edge
/// stored in the reserved 0xFF child slot, carrying the run length. This is
/// the sole evaluator for queries too short to produce a trigram.
pub struct PathTrie {
    nodes: Vec<Node>,
}

impl Default for PathTrie {
    fn default() -> Self {
        Self::new()
    }
}

impl PathTrie {
    pub fn new() -> Self {
        PathTrie {
            nodes: vec![Node::new(0, 0)],
        }
    }

    /// Number of arena nodes, root included.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn alloc(&mut self, key: u8, run_len: u32) -> u32 {
        let idx = self.nodes.len() as u32;
        self.nodes.push(Node::new(key, run_len));
        idx
    }

    fn step_plain(&mut self, cur: usize, b: u8) -> usize {
        debug_assert_ne!(b as usize, RUN_SLOT);
        let existing = self.nodes[cur].children[b as usize];
        if existing != NO_CHILD {
            return existing as usize;
        }
        let idx = self.alloc(b, 0);
        self.nodes[cur].children[b as usize] = idx;
        idx as usize
    }

    /// Insert `path`, marking its terminal with `id`. Re-inserting an
    /// already-terminal path updates the id to the newer value.
    pub fn insert(&mut self, path: &[u8], id: FileId) {
        if path.is_empty() {
            return;
        }

        let mut cur = 0usize;
        let mut i = 0usize;

        while i < path.len() {
            let b = path[i];
            let mut run = 1usize;
            while i + run < path.len() && path[i + run] == b {
                run += 1;
            }

            // Runs (and any 0xFF byte, whose plain slot is reserved) go
            // through the run edge.
            if run >= 2 || b as usize == RUN_SLOT {
                let slot = self.nodes[cur].children[RUN_SLOT];

                if slot == NO_CHILD {
                    let idx = self.alloc(b, run as u32);
                    self.nodes[cur].children[RUN_SLOT] = idx;
                    cur = idx as usize;
                    i += run;
                    continue;
                }

                let s = slot as usize;
                if self.nodes[s].key == b {
                    let n = self.nodes[s].run_len as usize;
                    if n <= run {
                        // Consume the existing edge; any leftover repeats of
                        // `b` are handled on the next iteration below `s`.
                        cur = s;
                        i += n;
                        continue;
                    }
                    // Existing edge is longer than our run: expand ours
                    // byte-wise instead.
                }

                if b as usize == RUN_SLOT {
                    // A 0xFF run that cannot share the reserved slot has no
                    // plain-edge fallback. Leave the path to the trigram
                    // index; sub-trigram queries will miss it.
                    warn!("[trie] conflicting 0xFF run, path not inserted");
                    return;
                }

                for _ in 0..run {
                    cur = self.step_plain(cur, b);
                }
                i += run;
                continue;
            }

            cur = self.step_plain(cur, b);
            i += 1;
        }

        let node = &mut self.nodes[cur];
        node.terminal = true;
        node.file_id = id;
    }

    /// Collect terminal ids of every path starting with `query`, DFS
    /// pre-order, up to `max_results`. Run edges are consumed transparently;
    /// a query may also end inside a run.
    pub fn find_prefix(&self, query: &[u8], max_results: usize) -> Vec<FileId> {
        let mut out = Vec::new();
        if max_results == 0 {
            return out;
        }
        self.walk_prefix(0, query, &mut out, max_results);
        out
    }

    fn walk_prefix(&self, cur: usize, q: &[u8], out: &mut Vec<FileId>, max: usize) {
        if out.len() >= max {
            return;
        }
        if q.is_empty() {
            self.collect_terminals(cur, out, max);
            return;
        }

        let b = q[0];
        let mut qrun = 1usize;
        while qrun < q.len() && q[qrun] == b {
            qrun += 1;
        }

        if b as usize != RUN_SLOT {
            let c = self.nodes[cur].children[b as usize];
            if c != NO_CHILD {
                self.walk_prefix(c as usize, &q[1..], out, max);
            }
        }

        let r = self.nodes[cur].children[RUN_SLOT];
        if r != NO_CHILD {
            let rn = &self.nodes[r as usize];
            if rn.key == b {
                let n = rn.run_len as usize;
                if qrun >= n {
                    self.walk_prefix(r as usize, &q[n..], out, max);
                } else if qrun == q.len() {
                    // Query exhausted inside the run: everything below
                    // carries the full run, so this is a prefix match.
                    self.collect_terminals(r as usize, out, max);
                }
            }
        }
    }

    /// Exact-match lookup: the whole of `path` must land on a terminal.
    pub fn lookup_exact(&self, path: &[u8]) -> Option<FileId> {
        self.walk_exact(0, path)
    }

    fn walk_exact(&self, cur: usize, q: &[u8]) -> Option<FileId> {
        if q.is_empty() {
            let node = &self.nodes[cur];
            return node.terminal.then_some(node.file_id);
        }

        let b = q[0];
        let mut qrun = 1usize;
        while qrun < q.len() && q[qrun] == b {
            qrun += 1;
        }

        if b as usize != RUN_SLOT {
            let c = self.nodes[cur].children[b as usize];
            if c != NO_CHILD {
                if let Some(id) = self.walk_exact(c as usize, &q[1..]) {
                    return Some(id);
                }
            }
        }

        let r = self.nodes[cur].children[RUN_SLOT];
        if r != NO_CHILD {
            let rn = &self.nodes[r as usize];
            if rn.key == b && qrun >= rn.run_len as usize {
                return self.walk_exact(r as usize, &q[rn.run_len as usize..]);
            }
        }

        None
    }

    fn collect_terminals(&self, cur: usize, out: &mut Vec<FileId>, max: usize) {
        if out.len() >= max {
            return;
        }
        let node = &self.nodes[cur];
        if node.terminal {
            out.push(node.file_id);
            if out.len() >= max {
                return;
            }
        }
        // Slot 0xFF (the run edge) is visited last, after all plain edges.
        for slot in 0..256usize {
            let c = node.children[slot];
            if c != NO_CHILD {
                self.collect_terminals(c as usize, out, max);
                if out.len() >= max {
                    return;
                }
            }
        }
    }

    /// Reconstruct every inserted byte string with its terminal id, DFS
    /// pre-order. Run edges expand back to their repeated bytes, so the
    /// yield is byte-exact.
    pub fn paths(&self) -> Vec<(Vec<u8>, FileId)> {
        let mut out = Vec::new();
        let mut buf = Vec::new();
        self.reconstruct(0, &mut buf, &mut out);
        out
    }

    fn reconstruct(&self, cur: usize, buf: &mut Vec<u8>, out: &mut Vec<(Vec<u8>, FileId)>) {
        let node = &self.nodes[cur];
        if node.terminal {
            out.push((buf.clone(), node.file_id));
        }
        for slot in 0..256usize {
            let c = node.children[slot];
            if c == NO_CHILD {
                continue;
            }
            let child = &self.nodes[c as usize];
            let pushed = if child.run_len > 0 {
                for _ in 0..child.run_len {
                    buf.push(child.key);
                }
                child.run_len as usize
            } else {
                buf.push(child.key);
                1
            };
            self.reconstruct(c as usize, buf, out);
            buf.truncate(buf.len() - pushed);
        }
    }
}

#[cfg(test)]
#[path = "trie_tests.rs"]
mod tests;
