use nom::{
    branch::alt,
    bytes::complete::{tag_no_case, take_until, take_while1},
    character::complete::{char, digit1, multispace0, multispace1},
    combinator::{map, map_res, opt, value},
    multi::{many1, separated_list1},
    sequence::{delimited, preceded, separated_pair, tuple},
    IResult,
};

use crate::model::{Field, RecordDraft};
use crate::session::Theme;

#[derive(Debug, PartialEq, Clone)]
pub enum Command {
    Register(RecordDraft),
    Find { predicates: Vec<(Field, String)> },
    Freq { field: Field },
    Cross { rows: Field, columns: Field },
    Summary,
    Dashboard,
    Delete { id: u64 },
    PendingAdd { field: Field, value: String },
    PendingClear,
    PendingShow,
    Theme(Theme),
    Help,
    Exit,
}

// Left-hand side of a REGISTER assignment.
#[derive(Debug, Clone, Copy)]
enum Slot {
    Text(Field),
    Area,
}

// --- BASIC PARSERS ---

fn parse_word(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_alphanumeric() || c == '_')(input)
}

fn parse_quoted_string(input: &str) -> IResult<&str, String> {
    let (input, _) = char('"')(input)?;
    let (input, content) = take_until("\"")(input)?;
    let (input, _) = char('"')(input)?;
    Ok((input, content.to_string()))
}

fn parse_bare(input: &str) -> IResult<&str, String> {
    map(take_while1(|c: char| !c.is_whitespace() && c != '"'), str::to_string)(input)
}

fn parse_value(input: &str) -> IResult<&str, String> {
    alt((parse_quoted_string, parse_bare))(input)
}

fn parse_field(input: &str) -> IResult<&str, Field> {
    map_res(parse_word, |w: &str| w.parse::<Field>())(input)
}

fn parse_slot(input: &str) -> IResult<&str, Slot> {
    map_res(parse_word, |w: &str| match w.to_lowercase().as_str() {
        "area" | "hectares" | "area_hectares" => Ok(Slot::Area),
        _ => w.parse::<Field>().map(Slot::Text),
    })(input)
}

fn parse_id(input: &str) -> IResult<&str, u64> {
    map_res(digit1, |s: &str| s.parse::<u64>())(input)
}

// --- HELPERS ---
fn ws<'a, F, O, E: nom::error::ParseError<&'a str>>(inner: F) -> impl FnMut(&'a str) -> IResult<&'a str, O, E>
where F: FnMut(&'a str) -> IResult<&'a str, O, E> {
    delimited(multispace0, inner, multispace0)
}

fn tag_ci(t: &'static str) -> impl FnMut(&str) -> IResult<&str, &str> {
    move |input| tag_no_case(t)(input)
}

// --- COMMAND PARSERS ---

fn parse_register(input: &str) -> IResult<&str, Command> {
    let (input, _) = tag_ci("REGISTER")(input)?;
    let (input, assignments) = many1(preceded(
        multispace1,
        separated_pair(parse_slot, ws(char('=')), parse_value),
    ))(input)?;

    let mut draft = RecordDraft::default();
    for (slot, text) in assignments {
        match slot {
            Slot::Text(field) => *draft.field_mut(field) = text,
            Slot::Area => draft.area_hectares = text,
        }
    }
    Ok((input, Command::Register(draft)))
}

fn parse_predicate(input: &str) -> IResult<&str, (Field, String)> {
    separated_pair(parse_field, ws(char('~')), parse_value)(input)
}

fn parse_find(input: &str) -> IResult<&str, Command> {
    let (input, _) = alt((tag_ci("FIND"), tag_ci("SELECT")))(input)?;
    let (input, predicates) = opt(preceded(
        ws(tag_ci("WHERE")),
        separated_list1(ws(tag_ci("AND")), parse_predicate),
    ))(input)?;
    Ok((input, Command::Find { predicates: predicates.unwrap_or_default() }))
}

fn parse_freq(input: &str) -> IResult<&str, Command> {
    let (input, _) = alt((tag_ci("FREQ"), tag_ci("COUNT")))(input)?;
    let (input, field) = preceded(multispace1, parse_field)(input)?;
    Ok((input, Command::Freq { field }))
}

fn parse_cross(input: &str) -> IResult<&str, Command> {
    let (input, _) = tag_ci("CROSS")(input)?;
    let (input, (rows, _, columns)) = preceded(
        multispace1,
        tuple((parse_field, ws(alt((tag_ci("BY"), tag_ci("PER"), tag_ci("X")))), parse_field)),
    )(input)?;
    Ok((input, Command::Cross { rows, columns }))
}

fn parse_delete(input: &str) -> IResult<&str, Command> {
    let (input, _) = tag_ci("DELETE")(input)?;
    let (input, _) = multispace1(input)?;
    let (input, id) = parse_id(input)?;
    Ok((input, Command::Delete { id }))
}

fn parse_pending(input: &str) -> IResult<&str, Command> {
    let (input, _) = tag_ci("PENDING")(input)?;
    let add = map(
        preceded(tuple((multispace1, tag_ci("ADD"), multispace1)), tuple((parse_field, ws(parse_value)))),
        |(field, value)| Command::PendingAdd { field, value },
    );
    let clear = value(Command::PendingClear, preceded(multispace1, tag_ci("CLEAR")));
    let (input, cmd) = opt(alt((add, clear)))(input)?;
    Ok((input, cmd.unwrap_or(Command::PendingShow)))
}

fn parse_theme(input: &str) -> IResult<&str, Command> {
    let (input, _) = tag_ci("THEME")(input)?;
    let (input, theme) = preceded(
        multispace1,
        alt((value(Theme::Light, tag_ci("LIGHT")), value(Theme::Dark, tag_ci("DARK")))),
    )(input)?;
    Ok((input, Command::Theme(theme)))
}

fn parse_keyword(input: &str) -> IResult<&str, Command> {
    alt((
        value(Command::Summary, tag_ci("SUMMARY")),
        value(Command::Dashboard, alt((tag_ci("DASHBOARD"), tag_ci("STATS")))),
        value(Command::Help, tag_ci("HELP")),
        value(Command::Exit, alt((tag_ci("EXIT"), tag_ci("QUIT")))),
    ))(input)
}

pub fn parse_command(input: &str) -> Result<Command, String> {
    let input = input.trim();
    let result = alt((
        parse_register,
        parse_find,
        parse_freq,
        parse_cross,
        parse_delete,
        parse_pending,
        parse_theme,
        parse_keyword,
    ))(input);

    match result {
        Ok((remainder, cmd)) => {
            if !remainder.trim().is_empty() {
                return Err(format!("Unexpected tokens at end: '{}'", remainder.trim()));
            }
            Ok(cmd)
        },
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
            let context: String = e.input.chars().take(20).collect();
            let ellipsis = if e.input.chars().count() > 20 { "..." } else { "" };
            Err(format!("Invalid syntax near: '{}{}'", context, ellipsis))
        },
        Err(nom::Err::Incomplete(_)) => Err("Incomplete command.".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_in_any_order() {
        let cmd = parse_command(
            r#"register area=10.5 crop="Soja" pests="Lagarta, Percevejo" cidade=Sorriso pesticides="""#,
        )
        .unwrap();
        assert_eq!(
            cmd,
            Command::Register(RecordDraft {
                crop: "Soja".into(),
                pests: "Lagarta, Percevejo".into(),
                pesticides: String::new(),
                area_hectares: "10.5".into(),
                cities: "Sorriso".into(),
            })
        );
    }

    #[test]
    fn find_with_and_without_predicates() {
        assert_eq!(parse_command("FIND").unwrap(), Command::Find { predicates: vec![] });
        assert_eq!(
            parse_command(r#"find where city ~ "sorriso" and pests~branca"#).unwrap(),
            Command::Find {
                predicates: vec![(Field::Cities, "sorriso".into()), (Field::Pests, "branca".into())]
            }
        );
    }

    #[test]
    fn stats_commands() {
        assert_eq!(parse_command("FREQ pests").unwrap(), Command::Freq { field: Field::Pests });
        assert_eq!(
            parse_command("CROSS pests BY pesticides").unwrap(),
            Command::Cross { rows: Field::Pests, columns: Field::Pesticides }
        );
        assert_eq!(parse_command("summary").unwrap(), Command::Summary);
        assert_eq!(parse_command("STATS").unwrap(), Command::Dashboard);
    }

    #[test]
    fn session_commands() {
        assert_eq!(
            parse_command(r#"PENDING ADD pests "Mosca-Branca""#).unwrap(),
            Command::PendingAdd { field: Field::Pests, value: "Mosca-Branca".into() }
        );
        assert_eq!(parse_command("pending clear").unwrap(), Command::PendingClear);
        assert_eq!(parse_command("PENDING").unwrap(), Command::PendingShow);
        assert_eq!(parse_command("THEME dark").unwrap(), Command::Theme(Theme::Dark));
    }

    #[test]
    fn delete_and_errors() {
        assert_eq!(parse_command("DELETE 12").unwrap(), Command::Delete { id: 12 });
        assert!(parse_command("DELETE abc").is_err());
        assert!(parse_command("FREQ hectares").is_err());
        assert!(parse_command("SUMMARY please").unwrap_err().starts_with("Unexpected tokens"));
        assert!(parse_command("REGISTER weight=3").is_err());
    }
}
