use std::collections::BTreeMap;
use std::io;

use failure::Fail;
use log::{debug, warn};
use serde::Serialize;

use super::comparable_finder::{ComparableFinder, MatchError, PropertyRecord};
use super::dataset_loader::Dataset;

const NO_COMPARABLES_MESSAGE: &str = "No comparable properties found based on the given criteria.";

#[derive(Debug, Fail)]
pub enum BrowseError {
    #[fail(display = "Dataset is empty")]
    EmptyDataset,
    #[fail(display = "Index {} is out of range, dataset has {} properties", _0, _1)]
    IndexOutOfRange(usize, usize),
    #[fail(display = "{}", _0)]
    Match(MatchError),
    #[fail(display = "I/O error: {}", _0)]
    Io(io::Error),
    #[fail(display = "JSON error: {}", _0)]
    Json(serde_json::Error),
}

impl From<io::Error> for BrowseError {
    fn from(err: io::Error) -> BrowseError {
        BrowseError::Io(err)
    }
}

impl From<serde_json::Error> for BrowseError {
    fn from(err: serde_json::Error) -> BrowseError {
        BrowseError::Json(err)
    }
}

/// Position over the dataset. Moves are clamped to `[0, len - 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Navigator {
    current: usize,
    len: usize,
}

impl Navigator {
    pub fn new(len: usize, start: usize) -> Result<Navigator, BrowseError> {
        if len == 0 {
            return Err(BrowseError::EmptyDataset);
        }
        if start >= len {
            return Err(BrowseError::IndexOutOfRange(start, len));
        }
        Ok(Navigator {
            current: start,
            len,
        })
    }

    pub fn current(&self) -> usize {
        self.current
    }

    pub fn next(self) -> Navigator {
        Navigator {
            current: (self.current + 1).min(self.len - 1),
            ..self
        }
    }

    pub fn previous(self) -> Navigator {
        Navigator {
            current: self.current.saturating_sub(1),
            ..self
        }
    }

    pub fn goto(self, index: usize) -> Result<Navigator, BrowseError> {
        Navigator::new(self.len, index)
    }
}

#[derive(Debug, PartialEq)]
pub enum Command {
    Next,
    Previous,
    Goto(usize),
    Quit,
}

impl Command {
    pub fn parse(line: &str) -> Option<Command> {
        let mut words = line.split_whitespace();
        let command = match words.next()? {
            "n" | "next" => Command::Next,
            "p" | "prev" | "previous" => Command::Previous,
            "q" | "quit" => Command::Quit,
            "g" | "goto" => Command::Goto(words.next()?.parse().ok()?),
            _ => return None,
        };
        Some(command)
    }
}

/// Property fields keyed by dataset header.
type PropertyView<'a> = BTreeMap<&'a str, &'a str>;

#[derive(Debug, Serialize)]
pub struct SubjectView<'a> {
    pub index: usize,
    pub subject: PropertyView<'a>,
    pub comparables: Vec<PropertyView<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
}

fn property_view<'a>(headers: &'a [String], record: &'a PropertyRecord) -> PropertyView<'a> {
    headers
        .iter()
        .zip(record.cells.iter())
        .map(|(h, c)| (h.as_str(), c.as_str()))
        .collect()
}

pub fn subject_view<'a>(
    dataset: &'a Dataset,
    finder: &ComparableFinder,
    index: usize,
) -> Result<SubjectView<'a>, BrowseError> {
    let subject = dataset
        .records
        .get(index)
        .ok_or_else(|| BrowseError::IndexOutOfRange(index, dataset.len()))?;

    let comparables = finder
        .find_comparables(subject, &dataset.records)
        .map_err(BrowseError::Match)?;

    Ok(SubjectView {
        index,
        subject: property_view(&dataset.headers, subject),
        message: if comparables.is_empty() {
            Some(NO_COMPARABLES_MESSAGE)
        } else {
            None
        },
        comparables: comparables
            .into_iter()
            .map(|c| property_view(&dataset.headers, c))
            .collect(),
    })
}

fn write_view<W: io::Write>(
    output: &mut W,
    dataset: &Dataset,
    finder: &ComparableFinder,
    index: usize,
) -> Result<(), BrowseError> {
    match subject_view(dataset, finder, index) {
        Ok(view) => {
            serde_json::to_writer_pretty(&mut *output, &view)?;
            writeln!(output)?;
        }
        // An unmatched subject is shown, not fatal; the user can move on.
        Err(BrowseError::Match(e)) => writeln!(output, "Property {}: {}", index, e)?,
        Err(e) => return Err(e),
    }
    output.flush()?;
    Ok(())
}

/// Shows one subject at a time, moving on the commands read from `input`.
pub fn browse<R: io::BufRead, W: io::Write>(
    dataset: &Dataset,
    finder: &ComparableFinder,
    start: usize,
    input: R,
    mut output: W,
) -> Result<Navigator, BrowseError> {
    let mut navigator = Navigator::new(dataset.len(), start)?;
    write_view(&mut output, dataset, finder, navigator.current())?;

    for line in input.lines() {
        let line = line?;
        let moved = match Command::parse(&line) {
            Some(Command::Quit) => break,
            Some(Command::Next) => navigator.next(),
            Some(Command::Previous) => navigator.previous(),
            Some(Command::Goto(index)) => match navigator.goto(index) {
                Ok(moved) => moved,
                Err(e) => {
                    warn!("{}", e);
                    continue;
                }
            },
            None => {
                writeln!(output, "Commands: n(ext), p(rev), g(oto) <index>, q(uit)")?;
                continue;
            }
        };

        debug!("Moving from {} to {}", navigator.current(), moved.current());
        navigator = moved;
        write_view(&mut output, dataset, finder, navigator.current())?;
    }

    Ok(navigator)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comparable_finder::{ColumnLayout, MatchRules};
    use crate::dataset_loader::read_dataset;

    const HOTELS_CSV: &str = include_str!("comparable_finder/test_resources/hotels.csv");

    fn hotels() -> Dataset {
        read_dataset(HOTELS_CSV.as_bytes(), b',', ColumnLayout::hotel()).unwrap()
    }

    #[test]
    fn it_should_clamp_navigation_to_the_dataset() {
        let nav = Navigator::new(3, 0).unwrap();

        assert_eq!(nav.previous().current(), 0);
        assert_eq!(nav.next().next().next().current(), 2);
        assert_matches!(nav.goto(3), Err(BrowseError::IndexOutOfRange(3, 3)));
    }

    #[test]
    fn it_should_refuse_an_empty_dataset() {
        assert_matches!(Navigator::new(0, 0), Err(BrowseError::EmptyDataset));
    }

    #[test]
    fn it_should_parse_commands() {
        assert_eq!(Command::parse("n"), Some(Command::Next));
        assert_eq!(Command::parse(" prev "), Some(Command::Previous));
        assert_eq!(Command::parse("goto 4"), Some(Command::Goto(4)));
        assert_eq!(Command::parse("g x"), None);
        assert_eq!(Command::parse(""), None);
    }

    #[test]
    fn it_should_show_a_subject_with_its_comparables() {
        let dataset = hotels();
        let finder = ComparableFinder::new(MatchRules::hotel());

        let view = subject_view(&dataset, &finder, 0).unwrap();

        assert_eq!(view.subject["Hotel Name"], "Grand Plaza");
        let names: Vec<&str> = view.comparables.iter().map(|c| c["Hotel Name"]).collect();
        assert_eq!(names, vec!["Harbor View", "Budget Stay", "Riverside Inn"]);
        assert_eq!(view.message, None);
    }

    #[test]
    fn it_should_flag_a_subject_without_comparables() {
        let dataset = hotels();
        let finder = ComparableFinder::new(MatchRules::hotel());

        let view = subject_view(&dataset, &finder, 5).unwrap();

        assert!(view.comparables.is_empty());
        assert_eq!(view.message, Some(NO_COMPARABLES_MESSAGE));
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["comparables"], serde_json::json!([]));
    }

    #[test]
    fn it_should_follow_commands_until_quit() {
        let dataset = hotels();
        let finder = ComparableFinder::new(MatchRules::hotel());
        let mut output = Vec::new();

        let nav = browse(&dataset, &finder, 0, "n\nn\np\ng 7\nq\nn\n".as_bytes(), &mut output)
            .unwrap();

        assert_eq!(nav.current(), 7);
        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("Property 7: Subject 'Mystery Motel' has no value ratio"));
    }
}
