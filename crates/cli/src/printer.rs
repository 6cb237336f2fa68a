use std::io::{self, Write};

use pronto_engine::QueryHit;

/// One absolute path per line, ranked order, straight to stdout.
///
/// Paths are raw bytes on Unix; anything non-UTF-8 is written as-is rather
/// than lossily rewritten.
pub fn print_hits(hits: &[QueryHit]) {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    for hit in hits {
        // A closed pipe (e.g. `pronto foo | head`) is not an error.
        if out.write_all(&hit.path).is_err() {
            return;
        }
        if out.write_all(b"\n").is_err() {
            return;
        }
    }

    if hits.is_empty() {
        eprintln!("pronto: no matching files found");
    }
}
