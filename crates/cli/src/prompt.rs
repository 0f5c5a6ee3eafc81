//! Interactive year/week selection, used when `--year`/`--week` are absent.

use std::io::{BufRead, Write};

use crate::exit_codes::{EXIT_ERROR, EXIT_USAGE};
use crate::CliError;

/// How many past years the year menu offers besides the current one.
const PAST_YEARS: i32 = 5;

/// Current year first, then the five before it.
pub fn year_choices(current: i32) -> Vec<i32> {
    (0..=PAST_YEARS).map(|back| current - back).collect()
}

/// Validate a week number typed by the user or passed as a flag.
pub fn parse_week(input: &str) -> Result<u32, CliError> {
    let trimmed = input.trim();
    let week: u32 = trimmed.parse().map_err(|_| CliError {
        code: EXIT_USAGE,
        message: format!("invalid week number: {:?}", trimmed),
        hint: Some("enter a number between 1 and 53".into()),
    })?;
    check_week(week)
}

pub fn check_week(week: u32) -> Result<u32, CliError> {
    if !(1..=53).contains(&week) {
        return Err(CliError {
            code: EXIT_USAGE,
            message: format!("week {} is out of range", week),
            hint: Some("weeks run from 1 to 53".into()),
        });
    }
    Ok(week)
}

fn read_answer<R: BufRead>(input: &mut R) -> Result<String, CliError> {
    let mut buf = String::new();
    let n = input
        .read_line(&mut buf)
        .map_err(|e| CliError { code: EXIT_ERROR, message: e.to_string(), hint: None })?;
    if n == 0 {
        return Err(CliError {
            code: EXIT_USAGE,
            message: "no answer given (end of input)".into(),
            hint: Some("pass --year and --week to run non-interactively".into()),
        });
    }
    Ok(buf.trim().to_string())
}

/// Numbered year menu. Accepts the menu number or the year itself; an empty
/// answer picks the first entry.
pub fn prompt_year<R: BufRead, W: Write>(
    input: &mut R,
    out: &mut W,
    choices: &[i32],
) -> Result<i32, CliError> {
    writeln!(out, "Select year:").ok();
    for (i, year) in choices.iter().enumerate() {
        writeln!(out, "  {}) {}", i + 1, year).ok();
    }
    write!(out, "Choice [1]: ").ok();
    out.flush().ok();

    let answer = read_answer(input)?;
    if answer.is_empty() {
        if let Some(&first) = choices.first() {
            return Ok(first);
        }
    }

    let picked = answer.parse::<usize>().ok().and_then(|n| {
        choices
            .get(n.wrapping_sub(1))
            .copied()
            .or_else(|| choices.iter().copied().find(|&y| y as usize == n))
    });

    picked.ok_or_else(|| CliError {
        code: EXIT_USAGE,
        message: format!("invalid year choice: {:?}", answer),
        hint: Some(format!(
            "pick 1-{} or one of the listed years",
            choices.len(),
        )),
    })
}

pub fn prompt_week<R: BufRead, W: Write>(
    input: &mut R,
    out: &mut W,
    today_year: i32,
    today_week: u32,
) -> Result<u32, CliError> {
    write!(
        out,
        "Please enter the week number (Today: {} Week {}): ",
        today_year, today_week,
    )
    .ok();
    out.flush().ok();

    parse_week(&read_answer(input)?)
}
