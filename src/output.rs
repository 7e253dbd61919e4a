//! Terminal output for the `vsearch` binary

use crate::index::{
    CacheStats, ContentSearchResult, ContextSnippet, FileSearchResult, IndexStats, UpdateStats,
};
use regex::{Regex, RegexBuilder};
use serde::Serialize;
use std::io::{self, Write};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

/// Stdout stream honouring the `--color` decision
pub fn stdout(color: bool) -> StandardStream {
    StandardStream::stdout(if color {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    })
}

/// Pretty-printed JSON on its own line
pub fn print_json<W: Write, T: Serialize + ?Sized>(out: &mut W, value: &T) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *out, value).map_err(io::Error::other)?;
    writeln!(out)
}

fn path_spec() -> ColorSpec {
    let mut spec = ColorSpec::new();
    spec.set_fg(Some(Color::Magenta));
    spec
}

fn line_number_spec() -> ColorSpec {
    let mut spec = ColorSpec::new();
    spec.set_fg(Some(Color::Green));
    spec
}

fn match_spec() -> ColorSpec {
    let mut spec = ColorSpec::new();
    spec.set_fg(Some(Color::Red)).set_bold(true);
    spec
}

/// One file per line: the path with the matched name characters highlighted
pub fn print_file_results<W: WriteColor>(out: &mut W, results: &[FileSearchResult]) -> io::Result<()> {
    for result in results {
        let dir = result.path.strip_suffix(&result.name).unwrap_or("");
        out.set_color(&path_spec())?;
        write!(out, "{dir}")?;
        out.reset()?;

        for (i, c) in result.name.chars().enumerate() {
            if result.match_positions.contains(&i) {
                out.set_color(&match_spec())?;
                write!(out, "{c}")?;
                out.reset()?;
            } else {
                write!(out, "{c}")?;
            }
        }

        out.set_color(&line_number_spec())?;
        writeln!(out, "  {:.2}", result.score)?;
        out.reset()?;
    }
    Ok(())
}

/// `path:count` per result, like `rg -c`
pub fn print_content_results<W: WriteColor>(
    out: &mut W,
    results: &[ContentSearchResult],
) -> io::Result<()> {
    for result in results {
        out.set_color(&path_spec())?;
        write!(out, "{}", result.path)?;
        out.reset()?;
        write!(out, ":")?;
        out.set_color(&line_number_spec())?;
        writeln!(out, "{}", result.match_count)?;
        out.reset()?;
    }
    Ok(())
}

/// Snippets in ripgrep's heading layout: `N:` for matches, `N-` for context,
/// `--` between non-adjacent groups.
pub fn print_snippets<W: WriteColor>(
    out: &mut W,
    path: &str,
    query: &str,
    snippets: &[ContextSnippet],
) -> io::Result<()> {
    if snippets.is_empty() {
        return Ok(());
    }

    let highlight = RegexBuilder::new(&regex::escape(query.trim()))
        .case_insensitive(true)
        .build()
        .ok();

    out.set_color(path_spec().set_bold(true))?;
    writeln!(out, "{path}")?;
    out.reset()?;

    // Last line number written; overlapping context is printed once
    let mut printed_through = 0usize;

    for (i, snippet) in snippets.iter().enumerate() {
        let first = snippet
            .line_number
            .saturating_sub(snippet.context_before.len());

        if printed_through > 0 && first > printed_through + 1 {
            out.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)))?;
            writeln!(out, "--")?;
            out.reset()?;
        }

        for (offset, line) in snippet.context_before.iter().enumerate() {
            let number = first + offset;
            if number > printed_through {
                print_line(out, number, '-', line, None)?;
                printed_through = number;
            }
        }
        if snippet.line_number > printed_through {
            print_line(out, snippet.line_number, ':', &snippet.line, highlight.as_ref())?;
            printed_through = snippet.line_number;
        }

        // The next match line is printed by its own snippet
        let next_match = snippets.get(i + 1).map(|s| s.line_number);
        for (offset, line) in snippet.context_after.iter().enumerate() {
            let number = snippet.line_number + 1 + offset;
            if next_match.is_some_and(|n| number >= n) {
                break;
            }
            if number > printed_through {
                print_line(out, number, '-', line, None)?;
                printed_through = number;
            }
        }
    }

    Ok(())
}

fn print_line<W: WriteColor>(
    out: &mut W,
    number: usize,
    separator: char,
    line: &str,
    highlight: Option<&Regex>,
) -> io::Result<()> {
    out.set_color(&line_number_spec())?;
    write!(out, "{number}")?;
    out.reset()?;
    write!(out, "{separator}")?;

    let Some(pattern) = highlight else {
        return writeln!(out, "{line}");
    };

    let mut cursor = 0;
    for m in pattern.find_iter(line) {
        write!(out, "{}", &line[cursor..m.start()])?;
        out.set_color(&match_spec())?;
        write!(out, "{}", m.as_str())?;
        out.reset()?;
        cursor = m.end();
    }
    writeln!(out, "{}", &line[cursor..])
}

pub fn print_update<W: Write>(out: &mut W, stats: &UpdateStats) -> io::Result<()> {
    writeln!(
        out,
        "{} added, {} updated, {} removed",
        stats.added, stats.updated, stats.removed
    )
}

pub fn print_stats<W: Write>(out: &mut W, stats: &IndexStats) -> io::Result<()> {
    writeln!(out, "Index for {}", stats.root.display())?;
    writeln!(out, "  State:     {}", stats.state.as_str())?;
    writeln!(out, "  Record:    {}", stats.index_path.display())?;
    writeln!(out, "  Files:     {}", stats.file_count)?;
    writeln!(out, "  Documents: {}", stats.document_count)?;
    writeln!(out, "  Terms:     {}", stats.term_count)?;
    match stats.last_updated {
        Some(ms) => writeln!(out, "  Updated:   {ms} ms since epoch"),
        None => writeln!(out, "  Updated:   never"),
    }
}

pub fn print_cache_stats<W: Write>(out: &mut W, stats: &CacheStats) -> io::Result<()> {
    writeln!(
        out,
        "Cache: {}/{} indexes, ttl {} ms ({} hits, {} misses, {} evictions, {} expirations)",
        stats.size,
        stats.max_vaults,
        stats.ttl_ms,
        stats.hits,
        stats.misses,
        stats.evictions,
        stats.expirations
    )
}
