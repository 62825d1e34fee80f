#[macro_use]
extern crate clap;
use clap::{App, AppSettings, Arg, ArgMatches, SubCommand};

#[macro_use]
extern crate failure;
use failure::Error;

#[cfg(test)]
#[macro_use]
extern crate assert_matches;

use log::{error, info};
use simplelog;
use std::io;

mod browser;
mod cli_utils;
mod comparable_finder;
mod dataset_loader;
mod file_processor;
mod row_flattener;

use chrono::offset::Local;
use comparable_finder::{ColumnLayout, ComparableFinder, MatchRules};
use dataset_loader::Dataset;

#[derive(Debug, Fail)]
pub enum MainError {
    #[fail(display = "Delimiter must be a single byte, got {:?}", _0)]
    InvalidDelimiter(String),
}

fn main() {
    let matches = build_cli().get_matches();

    let level = if matches.is_present("verbose") {
        simplelog::LevelFilter::Debug
    } else {
        simplelog::LevelFilter::Info
    };

    let local_time = Local::now();
    let time_offset = local_time.offset();
    // Configure logging
    simplelog::TermLogger::init(
        level,
        simplelog::Config {
            offset: time_offset.clone(),
            ..simplelog::Config::default()
        },
        simplelog::TerminalMode::Stderr,
    )
    .ok();

    match do_main(&matches) {
        Ok(_) => info!("Process finished OK"),
        Err(err) => {
            error!("Process finished with an error: {}", err);
            std::process::exit(1);
        }
    };
}

fn with_dataset_args<'a, 'b>(command: App<'a, 'b>) -> App<'a, 'b> {
    command
        .arg(
            Arg::with_name("delimiter")
                .short("d")
                .long("delimiter")
                .help("Delimiter for input and output fields")
                .takes_value(true)
                .default_value(","),
        )
        .arg(
            Arg::with_name("layout")
                .long("layout")
                .help("Column names and matching defaults of the dataset")
                .takes_value(true)
                .possible_values(&["hotel", "apartment"])
                .default_value("hotel"),
        )
        .arg(
            Arg::with_name("column")
                .long("column")
                .help("Overrides one column name, e.g. ratio=VPU. Roles: ratio, name, address, value, class, owner-name, owner-address, type, account")
                .takes_value(true)
                .multiple(true)
                .number_of_values(1),
        )
        .arg(
            Arg::with_name("asset-type")
                .long("asset-type")
                .help("Type every comparable must have. Defaults to the layout's type.")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("class-rule")
                .long("class-rule")
                .help("'match-subject' or 'fixed:<tier>'")
                .takes_value(true)
                .default_value("match-subject"),
        )
        .arg(
            Arg::with_name("ratio-rule")
                .long("ratio-rule")
                .help("'half-band' (50% to 100% of the subject's ratio) or 'upper-150' (up to 150%)")
                .takes_value(true)
                .default_value("half-band"),
        )
        .arg(
            Arg::with_name("rank")
                .long("rank")
                .help("'combined' or 'value-ratio'")
                .takes_value(true)
                .default_value("combined"),
        )
        .arg(
            Arg::with_name("value-band")
                .long("value-band")
                .help("Maximum absolute market value difference")
                .takes_value(true)
                .default_value("100000"),
        )
        .arg(
            Arg::with_name("limit")
                .long("limit")
                .help("Number of comparables per property, at most 5")
                .takes_value(true)
                .default_value("5"),
        )
}

fn build_cli<'a, 'b>() -> App<'a, 'b> {
    App::new("comparable-finder")
        .version(crate_version!())
        .about("Finds comparable properties and exports them as a flat report")
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .arg(
            Arg::with_name("verbose")
                .short("v")
                .long("verbose")
                .global(true)
                .help("Log debug messages"),
        )
        .subcommand(with_dataset_args(
            SubCommand::with_name("report")
                .about("Writes one row per property with its comparables")
                .arg(
                    Arg::with_name("input")
                        .short("i")
                        .long("input")
                        .help("Sets the dataset to use. If omitted, stdin will be used.")
                        .takes_value(true),
                )
                .arg(
                    Arg::with_name("output")
                        .short("o")
                        .long("output")
                        .help("Sets the report file to create. If omitted, stdout will be used.")
                        .takes_value(true),
                )
                .arg(
                    Arg::with_name("quiet")
                        .short("q")
                        .long("quiet")
                        .help("Hide the progress bar"),
                ),
        ))
        .subcommand(with_dataset_args(
            SubCommand::with_name("show")
                .about("Prints one property and its comparables as JSON")
                .arg(
                    Arg::with_name("input")
                        .short("i")
                        .long("input")
                        .help("Sets the dataset to use")
                        .takes_value(true)
                        .required(true),
                )
                .arg(
                    Arg::with_name("index")
                        .long("index")
                        .help("Row of the property, 0 based")
                        .takes_value(true)
                        .required(true),
                ),
        ))
        .subcommand(with_dataset_args(
            SubCommand::with_name("browse")
                .about("Steps through properties with commands read from stdin")
                .arg(
                    Arg::with_name("input")
                        .short("i")
                        .long("input")
                        .help("Sets the dataset to use")
                        .takes_value(true)
                        .required(true),
                )
                .arg(
                    Arg::with_name("index")
                        .long("index")
                        .help("Row to start from, 0 based")
                        .takes_value(true)
                        .default_value("0"),
                ),
        ))
}

fn parse_delimiter(raw: &str) -> Result<u8, MainError> {
    // Allows passing a literal "\t" from the shell.
    let delimiter = raw.replace("\\t", "\t");
    match delimiter.as_bytes() {
        [byte] => Ok(*byte),
        _ => Err(MainError::InvalidDelimiter(raw.to_owned())),
    }
}

fn column_layout(matches: &ArgMatches) -> Result<ColumnLayout, Error> {
    let mut layout = ColumnLayout::by_name(matches.value_of("layout").unwrap_or("hotel"))?;
    for column in matches.values_of("column").unwrap_or_default() {
        layout.apply_override(column)?;
    }
    Ok(layout)
}

fn match_rules(matches: &ArgMatches) -> Result<MatchRules, Error> {
    let mut rules = match matches.value_of("layout") {
        Some("apartment") => MatchRules::apartment(),
        _ => MatchRules::hotel(),
    };

    if let Some(asset_type) = matches.value_of("asset-type") {
        rules.asset_type = asset_type.to_owned();
    }
    rules.class_rule = matches.value_of("class-rule").unwrap_or_default().parse()?;
    rules.ratio_rule = matches.value_of("ratio-rule").unwrap_or_default().parse()?;
    rules.ranking = matches.value_of("rank").unwrap_or_default().parse()?;

    let rules = rules
        .with_value_band(value_t!(matches, "value-band", f64)?)?
        .with_limit(value_t!(matches, "limit", usize)?)?;

    info!("Matching rules: {:?}", rules);
    Ok(rules)
}

fn load_input(matches: &ArgMatches, delimiter: u8) -> Result<Dataset, Error> {
    let layout = column_layout(matches)?;

    let dataset = match matches.value_of("input") {
        Some(path) => dataset_loader::load_dataset(path, delimiter, layout)?,
        None => {
            info!("Reading from stdin");
            let stdin = io::stdin();
            let input = stdin.lock();
            dataset_loader::read_dataset(input, delimiter, layout)?
        }
    };
    Ok(dataset)
}

fn report_command(matches: &ArgMatches) -> Result<(), Error> {
    let delimiter = parse_delimiter(matches.value_of("delimiter").unwrap_or_default())?;
    let finder = ComparableFinder::new(match_rules(matches)?);
    let dataset = load_input(matches, delimiter)?;

    let stdout = io::stdout();
    let output_file: Box<dyn io::Write + '_> = match matches.value_of("output") {
        Some(path) => {
            info!("Writing to file {}.", path);
            Box::new(io::BufWriter::new(std::fs::File::create(path)?))
        }
        None => Box::new(stdout.lock()),
    };

    let stats = file_processor::comparables_report(
        &dataset,
        &finder,
        output_file,
        delimiter,
        matches.is_present("quiet"),
    )?;
    info!("Stats: {:?}", stats);

    Ok(())
}

fn show_command(matches: &ArgMatches) -> Result<(), Error> {
    let delimiter = parse_delimiter(matches.value_of("delimiter").unwrap_or_default())?;
    let finder = ComparableFinder::new(match_rules(matches)?);
    let dataset = load_input(matches, delimiter)?;
    let index = value_t!(matches, "index", usize)?;

    let view = browser::subject_view(&dataset, &finder, index)?;

    let stdout = io::stdout();
    serde_json::to_writer_pretty(stdout.lock(), &view)?;
    println!();
    Ok(())
}

fn browse_command(matches: &ArgMatches) -> Result<(), Error> {
    let delimiter = parse_delimiter(matches.value_of("delimiter").unwrap_or_default())?;
    let finder = ComparableFinder::new(match_rules(matches)?);
    let dataset = load_input(matches, delimiter)?;
    let start = value_t!(matches, "index", usize)?;

    let stdin = io::stdin();
    let stdout = io::stdout();
    let last = browser::browse(&dataset, &finder, start, stdin.lock(), stdout.lock())?;
    info!("Stopped at property {}", last.current());

    Ok(())
}

fn do_main(matches: &ArgMatches) -> Result<(), Error> {
    match matches.subcommand() {
        ("report", Some(sub_matches)) => report_command(sub_matches),
        ("show", Some(sub_matches)) => show_command(sub_matches),
        ("browse", Some(sub_matches)) => browse_command(sub_matches),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sub_matches<'a>(args: &[&str]) -> ArgMatches<'a> {
        let matches = build_cli().get_matches_from(args.iter().cloned());
        let (_, sub) = matches.subcommand();
        sub.cloned().unwrap()
    }

    #[test]
    fn it_should_parse_tab_delimiters() {
        assert_eq!(parse_delimiter("\\t").unwrap(), b'\t');
        assert_eq!(parse_delimiter(";").unwrap(), b';');
        assert_matches!(parse_delimiter(";;"), Err(MainError::InvalidDelimiter(_)));
    }

    #[test]
    fn it_should_build_default_rules() {
        let matches = sub_matches(&["comparable-finder", "report"]);

        assert_eq!(match_rules(&matches).unwrap(), MatchRules::hotel());
        assert_eq!(column_layout(&matches).unwrap(), ColumnLayout::hotel());
    }

    #[test]
    fn it_should_build_rules_from_flags() {
        let matches = sub_matches(&[
            "comparable-finder",
            "report",
            "--layout",
            "apartment",
            "--class-rule",
            "fixed:B",
            "--ratio-rule",
            "upper-150",
            "--rank",
            "value-ratio",
            "--limit",
            "3",
            "--column",
            "value=Market Value-2025",
        ]);

        let rules = match_rules(&matches).unwrap();
        assert_eq!(rules.asset_type, "Apartment");
        assert_eq!(rules.limit, 3);
        assert_eq!(
            rules.class_rule,
            comparable_finder::ClassRule::Fixed("B".to_owned())
        );
        assert_eq!(rules.ratio_rule, comparable_finder::RatioRule::UpperOneAndHalf);
        assert_eq!(rules.ranking, comparable_finder::Ranking::ValueThenRatio);

        let layout = column_layout(&matches).unwrap();
        assert_eq!(layout.ratio, "VPU");
        assert_eq!(layout.market_value, "Market Value-2025");
    }

    #[test]
    fn it_should_reject_unknown_rules() {
        let matches = sub_matches(&["comparable-finder", "report", "--ratio-rule", "double"]);

        assert!(match_rules(&matches).is_err());
    }
}
