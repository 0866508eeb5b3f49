use std::fmt::Write;

use chrono::NaiveDate;
use mensa_feed::{MealEntry, MealPrice, Price, WeeklyFeed};

fn price(p: Price) -> String {
    match p.cents() {
        Some(c) => {
            let sign = if c < 0 { "-" } else { "" };
            format!("{sign}{},{:02} €", c.abs() / 100, c.abs() % 100)
        },
        None => "-".into(),
    }
}

fn prices(p: &MealPrice) -> String {
    format!("{} / {} / {}", price(p.stud), price(p.bed), price(p.gast))
}

/// Escapes the characters legacy telegram markdown would interpret.
pub fn escape_markdown(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '_' | '*' | '`' | '[') { out.push('\\'); }
        out.push(c);
    }
    out
}

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// Categories in order of first appearance, each with its entries.
fn by_category<'a>(entries: &[&'a MealEntry]) -> Vec<(&'a str, Vec<&'a MealEntry>)> {
    let mut groups: Vec<(&str, Vec<&MealEntry>)> = Vec::new();
    for &entry in entries {
        match groups.iter_mut().find(|(c, _)| *c == entry.category) {
            Some((_, list)) => list.push(entry),
            None => groups.push((entry.category.as_str(), vec![entry])),
        }
    }
    groups
}

/// Dates in order of first appearance.
fn dates(feed: &WeeklyFeed) -> Vec<NaiveDate> {
    let mut dates = Vec::new();
    for entry in feed {
        if !dates.contains(&entry.date) { dates.push(entry.date); }
    }
    dates
}

fn day_section(out: &mut String, entries: &[&MealEntry]) {
    let Some(first) = entries.first() else { return };

    _ = writeln!(out, "*{}, {}*",
        escape_markdown(&first.day), first.date.format("%d.%m.%Y"));

    for (category, meals) in by_category(entries) {
        _ = writeln!(out, "\n_{}_", escape_markdown(category));
        for meal in meals {
            let labels = if meal.labels.is_empty() {
                String::new()
            } else {
                format!(" ({})", escape_markdown(&meal.labels.join(", ")))
            };
            _ = writeln!(out, "• {}{labels}\n  {}",
                escape_markdown(&meal.name), prices(&meal.price));
        }
    }
}

/// Markdown chat message for the meals of one date.
pub fn markdown_day(feed: &WeeklyFeed, date: NaiveDate) -> String {
    let entries: Vec<_> = feed.iter().filter(|v| v.date == date).collect();
    if entries.is_empty() {
        return format!("No menu for {}.", date.format("%d.%m.%Y"));
    }

    let mut out = String::new();
    day_section(&mut out, &entries);
    out.trim_end().to_string()
}

/// Markdown chat messages for a whole week, one section per date. Sections
/// are packed into as few messages as [`MESSAGE_LIMIT`] allows.
pub fn markdown_week(feed: &WeeklyFeed, week: u32) -> Vec<String> {
    if feed.is_empty() {
        return vec![format!("No menu for week {week}.")];
    }

    let mut sections = vec![format!("*Week {week}*")];
    for date in dates(feed) {
        let entries: Vec<_> = feed.iter().filter(|v| v.date == date).collect();
        let mut section = String::new();
        day_section(&mut section, &entries);
        sections.push(section.trim_end().to_string());
    }

    pack(
        sections.iter().flat_map(|v| split_message(v, MESSAGE_LIMIT)),
        "\n\n", MESSAGE_LIMIT,
    )
}

/// Telegram rejects longer message texts.
pub const MESSAGE_LIMIT: usize = 4096;

/// Cuts `text` into pieces of at most `limit` chars, at blank lines where
/// possible, then at line breaks.
pub fn split_message(text: &str, limit: usize) -> Vec<String> {
    if text.chars().count() <= limit {
        return vec![text.to_string()];
    }
    pack(text.split("\n\n").flat_map(|v| split_lines(v, limit)), "\n\n", limit)
}

fn split_lines(text: &str, limit: usize) -> Vec<String> {
    if text.chars().count() <= limit {
        return vec![text.to_string()];
    }
    pack(text.lines().flat_map(|v| split_chars(v, limit)), "\n", limit)
}

fn split_chars(line: &str, limit: usize) -> Vec<String> {
    let chars: Vec<char> = line.chars().collect();
    chars.chunks(limit.max(1)).map(|v| v.iter().collect()).collect()
}

/// Joins pieces with `sep`, starting a new message when the next one would
/// not fit. Every piece must already be within `limit`.
fn pack(pieces: impl IntoIterator<Item = String>, sep: &str, limit: usize) -> Vec<String> {
    let sep_len = sep.chars().count();
    let mut out = Vec::new();
    let mut current = String::new();
    let mut len = 0;

    for piece in pieces {
        let piece_len = piece.chars().count();
        if !current.is_empty() && len + sep_len + piece_len > limit {
            out.push(std::mem::take(&mut current));
            len = 0;
        }
        if !current.is_empty() {
            current.push_str(sep);
            len += sep_len;
        }
        current.push_str(&piece);
        len += piece_len;
    }

    if !current.is_empty() { out.push(current); }
    out
}

/// One line per entry, for terminals and logs.
pub fn pretty_week(feed: &WeeklyFeed) -> String {
    let mut out = String::new();
    for e in feed {
        let labels = if e.labels.is_empty() {
            String::new()
        } else {
            format!(" [{}]", e.labels.join(", "))
        };
        _ = writeln!(out, "{} {:<10} | {:<12} | {}{labels} | {}",
            e.date, e.day, e.category, e.name, prices(&e.price));
    }
    out
}

/// One json object per line.
pub fn jsonl_week(feed: &WeeklyFeed) -> serde_json::Result<String> {
    let mut out = String::new();
    for entry in feed {
        out.push_str(&serde_json::to_string(entry)?);
        out.push('\n');
    }
    Ok(out)
}

pub fn html_week(feed: &WeeklyFeed, week: u32) -> String {
    let mut out = String::new();
    _ = writeln!(out, "<!DOCTYPE html>\n<html lang=\"de\">\n<head>\n<meta charset=\"utf-8\">");
    _ = writeln!(out, "<title>Mensa week {week}</title>\n</head>\n<body>");
    _ = writeln!(out, "<h1>Mensa week {week}</h1>");

    if feed.is_empty() {
        _ = writeln!(out, "<p>No menu for week {week}.</p>");
    } else {
        _ = writeln!(out, "<table>\n<thead><tr><th>Date</th><th>Day</th><th>Category</th>\
            <th>Dish</th><th>Labels</th><th>Students</th><th>Staff</th><th>Guests</th></tr></thead>\n<tbody>");
        for e in feed {
            _ = writeln!(out, "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td>\
                <td>{}</td><td>{}</td><td>{}</td></tr>",
                e.date.format("%d.%m.%Y"),
                escape_html(&e.day),
                escape_html(&e.category),
                escape_html(&e.name),
                escape_html(&e.labels.join(", ")),
                price(e.price.stud), price(e.price.bed), price(e.price.gast),
            );
        }
        _ = writeln!(out, "</tbody>\n</table>");
    }

    _ = writeln!(out, "</body>\n</html>");
    out
}
