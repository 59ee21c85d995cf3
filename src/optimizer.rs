//! Source-level optimization: comment stripping, run cancellation, and the
//! peephole passes that rewrite recognized loop idioms into placeholder
//! opcodes consumed by the compiler.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use tracing::debug;

/// Program text rewritten over the extended alphabet `+-><.,[]CRLP`, plus
/// the side tables the placeholder opcodes refer to. The compiler consumes
/// each table front to back, in placeholder order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rewritten {
    pub code: String,
    /// Tape offset of the k-th copy target, relative to the source cell.
    pub copy_offsets: Vec<i32>,
    /// Multiplier applied to the source cell when adding into that target.
    pub copy_multipliers: Vec<i32>,
    /// Stride of the k-th scan placeholder.
    pub scan_strides: Vec<i32>,
}

static COMMENTS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^+\-><.,\[\]]").unwrap());
static ADD_RUNS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[+\-]{2,}").unwrap());
static MOVE_RUNS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[><]{2,}").unwrap());
static CLEAR_LOOPS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[C+\-]*(?:\[[+\-]+\])+\.*").unwrap());
static SCAN_LOOPS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[(>+|<+)\]").unwrap());
static KNOWN_ZERO: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[RL]+C|[CRL]+\.+").unwrap());
static OVERWRITTEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[+\-C]+,").unwrap());
static COPY_LOOPS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[-(?:[<>]+\++)+[<>]+\]|\[(?:[<>]+\++)+[<>]+-\]").unwrap());
static COPY_SEGMENTS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[<>]+\++").unwrap());

/// Normalize and rewrite a raw source string in one call.
pub fn optimize(source: &str, passes: usize) -> Rewritten {
    recognize(normalize(source), passes)
}

/// Strip bytes outside the eight-symbol alphabet and collapse cancelling
/// `+/-` and `>/<` runs to their signed net.
pub fn normalize(source: &str) -> String {
    let code = COMMENTS.replace_all(source, "");
    let code = ADD_RUNS.replace_all(&code, |m: &Captures| balanced(&m[0], '+', '-'));
    let code = MOVE_RUNS.replace_all(&code, |m: &Captures| balanced(&m[0], '>', '<'));
    code.into_owned()
}

fn balanced(run: &str, forward: char, backward: char) -> String {
    let net = run.matches(forward).count() as i64 - run.matches(backward).count() as i64;
    if net >= 0 {
        forward.to_string().repeat(net as usize)
    } else {
        backward.to_string().repeat(-net as usize)
    }
}

/// Run `passes` rounds of the idiom rewrites over normalized program text.
///
/// Each pass applies, in order: clear-loop fusion, scan-loop fusion,
/// known-zero elimination, stdin-overwrite elimination and copy-loop fusion.
/// A later rewrite can expose work for an earlier rule, which the next pass
/// picks up.
pub fn recognize(code: String, passes: usize) -> Rewritten {
    let mut code = code;
    let mut copy_offsets = Vec::new();
    let mut copy_multipliers = Vec::new();
    let mut scan_strides = Vec::new();

    for _ in 0..passes {
        // Clearing loops, chains of them, and any surrounding writes to the
        // cell being cleared collapse to a single clear. Output of the
        // cleared cell collapses with them: zero bytes are suppressed.
        code = CLEAR_LOOPS.replace_all(&code, "C").into_owned();

        code = SCAN_LOOPS
            .replace_all(&code, |m: &Captures| {
                let run = &m[1];
                scan_strides.push(run.len() as i32);
                if run.starts_with('>') { "R" } else { "L" }
            })
            .into_owned();

        code = drop_known_zero(&code, &mut scan_strides);

        code = OVERWRITTEN.replace_all(&code, ",").into_owned();

        code = COPY_LOOPS
            .replace_all(&code, |m: &Captures| {
                fuse_copy_loop(&m[0], &mut copy_offsets, &mut copy_multipliers)
            })
            .into_owned();
    }

    debug!(
        len = code.len(),
        copies = copy_offsets.len(),
        scans = scan_strides.len(),
        "idiom recognizer finished"
    );
    Rewritten { code, copy_offsets, copy_multipliers, scan_strides }
}

/// Delete clears and prints of cells that are provably zero. Scan
/// placeholders removed this way give up their stride entries so the
/// surviving `R`/`L` opcodes still line up with the side table.
fn drop_known_zero(code: &str, scan_strides: &mut Vec<i32>) -> String {
    let mut kept = String::with_capacity(code.len());
    let mut live = vec![true; scan_strides.len()];
    let mut ordinal = 0usize;
    let mut tail = 0usize;
    for m in KNOWN_ZERO.find_iter(code) {
        let before = &code[tail..m.start()];
        ordinal += scan_count(before);
        kept.push_str(before);
        for _ in 0..scan_count(m.as_str()) {
            live[ordinal] = false;
            ordinal += 1;
        }
        tail = m.end();
    }
    kept.push_str(&code[tail..]);
    let mut it = live.into_iter();
    scan_strides.retain(|_| it.next().unwrap());
    kept
}

fn scan_count(code: &str) -> usize {
    code.bytes().filter(|b| matches!(b, b'R' | b'L')).count()
}

/// Rewrite one matched copy/multiply-loop into `P…PC`, recording the target
/// offset and multiplier of every copy segment. Loops with net pointer
/// motion are left untouched, as are loops with a target that coincides
/// with the source cell.
fn fuse_copy_loop(body: &str, offsets: &mut Vec<i32>, multipliers: &mut Vec<i32>) -> String {
    if body.matches('>').count() != body.matches('<').count() {
        return body.to_string();
    }
    let mut segments = Vec::new();
    let mut offset = 0i32;
    for segment in COPY_SEGMENTS.find_iter(body) {
        let segment = segment.as_str();
        offset += segment.matches('>').count() as i32 - segment.matches('<').count() as i32;
        if offset == 0 {
            return body.to_string();
        }
        let multiplier = (segment.matches('+').count() % 256) as i32;
        if multiplier != 0 {
            segments.push((offset, multiplier));
        }
    }
    let mut fused = String::with_capacity(segments.len() + 1);
    for (offset, multiplier) in segments {
        offsets.push(offset);
        multipliers.push(multiplier);
        fused.push('P');
    }
    fused.push('C');
    fused
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_bytes_outside_the_alphabet() {
        assert_eq!(normalize("a+b[c]d.e"), "+[].");
        assert_eq!(normalize("read a byte, then\nprint it: ,."), ",,.");
    }

    #[test]
    fn collapses_cancelling_runs() {
        assert_eq!(normalize("++--"), "");
        assert_eq!(normalize("+++--"), "+");
        assert_eq!(normalize("++-->><<<"), "<");
        assert_eq!(normalize("><><"), "");
    }

    #[test]
    fn leaves_singletons_alone() {
        assert_eq!(normalize("+>-<."), "+>-<.");
    }

    #[test]
    fn fuses_clear_loops() {
        assert_eq!(optimize("+++[-]", 2).code, "C");
        assert_eq!(optimize("[+]", 2).code, "C");
        assert_eq!(optimize("[-][+]", 2).code, "C");
    }

    #[test]
    fn clear_loop_swallows_prints_of_the_cleared_cell() {
        assert_eq!(optimize("+++[-]...", 2).code, "C");
    }

    #[test]
    fn fuses_scan_loops_in_source_order() {
        let rw = optimize("+[<<]+[>>>]", 2);
        assert_eq!(rw.code, "+L+R");
        assert_eq!(rw.scan_strides, vec![2, 3]);
    }

    #[test]
    fn drops_clears_after_scans() {
        let rw = optimize("[>][-]", 2);
        assert_eq!(rw.code, "");
        assert_eq!(rw.scan_strides, Vec::<i32>::new());
    }

    #[test]
    fn known_zero_keeps_side_tables_aligned() {
        let rw = optimize("[>][-][>>]", 2);
        assert_eq!(rw.code, "R");
        assert_eq!(rw.scan_strides, vec![2]);
    }

    #[test]
    fn drops_writes_overwritten_by_input() {
        assert_eq!(optimize("+++,", 2).code, ",");
        assert_eq!(optimize("--,", 2).code, ",");
        assert_eq!(optimize("[-],", 2).code, ",");
    }

    #[test]
    fn fuses_copy_loops() {
        let rw = optimize("[->+<]", 2);
        assert_eq!(rw.code, "PC");
        assert_eq!(rw.copy_offsets, vec![1]);
        assert_eq!(rw.copy_multipliers, vec![1]);
    }

    #[test]
    fn fuses_multi_target_multiply_loops() {
        let rw = optimize("[->+>++<<]", 2);
        assert_eq!(rw.code, "PPC");
        assert_eq!(rw.copy_offsets, vec![1, 2]);
        assert_eq!(rw.copy_multipliers, vec![1, 2]);
    }

    #[test]
    fn fuses_trailing_decrement_copy_loops() {
        let rw = optimize("[>+++<-]", 2);
        assert_eq!(rw.code, "PC");
        assert_eq!(rw.copy_offsets, vec![1]);
        assert_eq!(rw.copy_multipliers, vec![3]);
    }

    #[test]
    fn fuses_backward_copy_targets() {
        let rw = optimize("[-<++>]", 2);
        assert_eq!(rw.code, "PC");
        assert_eq!(rw.copy_offsets, vec![-1]);
        assert_eq!(rw.copy_multipliers, vec![2]);
    }

    #[test]
    fn leaves_unbalanced_copy_loops_alone() {
        let rw = optimize("[->+<<]", 2);
        assert_eq!(rw.code, "[->+<<]");
        assert!(rw.copy_offsets.is_empty());
    }

    #[test]
    fn later_passes_see_earlier_rewrites() {
        // Pass one fuses the copy loop; pass two sees the clear it emitted
        // and drops the now known-zero print after it.
        assert_eq!(optimize("[->+<].", 2).code, "P");
    }

    #[test]
    fn zero_passes_only_normalize() {
        let rw = optimize("++x[-]y", 0);
        assert_eq!(rw.code, "++[-]");
        assert!(rw.copy_offsets.is_empty());
        assert!(rw.scan_strides.is_empty());
    }
}
