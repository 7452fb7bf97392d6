use std::error::Error;

use desmoche::prelude::*;
use tokio::io::{AsyncBufReadExt, BufReader};

const USAGE: &str = "usage: desmoche-terminal <session> <name> [host[:port]]";

const HELP: &str = "\
commands:
  ready          toggle ready in the lobby
  start          start the game (host only)
  swap <n>       exchange hand card n during setup
  draw           draw from the deck
  sel <n>        select or deselect hand card n
  meld           send the selected cards as a meld
  discard        discard the one selected card
  hand           show your hand
  table          show players, phase and discard pile
  quit";

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

#[derive(Debug, PartialEq, Eq)]
enum Input {
    Ready,
    Start,
    Swap(usize),
    Draw,
    Select(usize),
    Meld,
    Discard,
    Hand,
    Table,
    Help,
    Quit,
}

fn parse(line: &str) -> Result<Input, String> {
    let mut words = line.split_whitespace();
    let Some(word) = words.next() else {
        return Err("empty command".into());
    };
    let index = |arg: Option<&str>| -> Result<usize, String> {
        arg.ok_or_else(|| format!("`{word}` needs a card number"))?
            .parse()
            .map_err(|_| format!("`{word}` needs a card number"))
    };
    match word {
        "ready" => Ok(Input::Ready),
        "start" => Ok(Input::Start),
        "swap" => index(words.next()).map(Input::Swap),
        "draw" => Ok(Input::Draw),
        "sel" | "select" => index(words.next()).map(Input::Select),
        "meld" => Ok(Input::Meld),
        "discard" => Ok(Input::Discard),
        "hand" => Ok(Input::Hand),
        "table" => Ok(Input::Table),
        "help" | "?" => Ok(Input::Help),
        "quit" | "exit" => Ok(Input::Quit),
        other => Err(format!("unknown command `{other}`, try `help`")),
    }
}

/// Runs one input. Returns `false` when the user wants out.
fn run(client: &mut GameClient, input: Input) -> bool {
    let result = match input {
        Input::Ready => client.toggle_ready(),
        Input::Start => client.start_game(),
        Input::Swap(n) => client.exchange_card(n),
        Input::Draw => client.draw(),
        Input::Select(n) => {
            let result = client.toggle_selection(n);
            print_hand(client);
            result
        }
        Input::Meld => client.submit_meld(),
        Input::Discard => client.discard(),
        Input::Hand => {
            print_hand(client);
            Ok(())
        }
        Input::Table => {
            print_table(client);
            Ok(())
        }
        Input::Help => {
            println!("{HELP}");
            Ok(())
        }
        Input::Quit => return false,
    };
    if let Err(e) = result {
        println!("! {e}");
    }
    true
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

fn print_hand(client: &GameClient) {
    let selected = &client.intent().selected_indices;
    let cards: Vec<String> = client
        .table()
        .hand()
        .iter()
        .enumerate()
        .map(|(i, card)| {
            if selected.contains(&i) {
                format!("[{i}:{card}]")
            } else {
                format!("{i}:{card}")
            }
        })
        .collect();
    println!("hand: {}", cards.join(" "));
}

fn print_table(client: &GameClient) {
    let session = client.table().session();
    println!("phase: {}", session.phase);
    for player in &session.players {
        let ready = if player.is_ready { "ready" } else { "not ready" };
        let turn = if session.current_turn.as_deref() == Some(player.name.as_str()) {
            " <- turn"
        } else {
            ""
        };
        println!("  {} ({ready}){turn}", player.name);
    }
    if let Some(top) = session.discard_pile.last() {
        println!("discard: {top} ({} cards)", session.discard_pile.len());
    }
}

/// Prints log entries past `printed`, returning the new count.
fn print_log(client: &GameClient, printed: usize) -> usize {
    let entries = client.table().log().entries();
    for entry in entries.iter().skip(printed) {
        let prefix = match entry.kind {
            LogKind::System => "*",
            LogKind::Error => "!",
            LogKind::Game => ">",
        };
        println!("{prefix} {}", entry.text);
    }
    entries.len()
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    desmoche::init_tracing();

    let mut args = std::env::args().skip(1);
    let (Some(session), Some(name)) = (args.next(), args.next()) else {
        eprintln!("{USAGE}");
        std::process::exit(2);
    };
    let mut builder = ClientConfig::builder(session, name);
    if let Some(host) = args.next() {
        builder = builder.host(host);
    }
    let config = builder.build()?;
    eprintln!("joining {}", config.endpoint()?);

    let mut client = GameClient::new(config);
    client.connect()?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut printed = 0;
    let mut toast: Option<String> = None;
    loop {
        tokio::select! {
            step = client.step() => {
                if step == Step::Connection(ConnectionState::Disconnected) {
                    print_log(&client, printed);
                    break;
                }
            }
            line = lines.next_line() => match line? {
                Some(line) if line.trim().is_empty() => {}
                Some(line) => match parse(&line) {
                    Ok(input) => {
                        tracing::debug!(?input, "command");
                        if !run(&mut client, input) {
                            break;
                        }
                    }
                    Err(e) => println!("! {e}"),
                },
                None => break,
            },
        }
        printed = print_log(&client, printed);
        if client.intent().toast != toast {
            toast = client.intent().toast.clone();
            if let Some(text) = &toast {
                println!("~ {text}");
            }
        }
    }

    client.disconnect();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(parse("ready"), Ok(Input::Ready));
        assert_eq!(parse("  swap 3 "), Ok(Input::Swap(3)));
        assert_eq!(parse("sel 0"), Ok(Input::Select(0)));
        assert_eq!(parse("select 12"), Ok(Input::Select(12)));
        assert_eq!(parse("quit"), Ok(Input::Quit));
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(parse("swap").is_err());
        assert!(parse("sel x").is_err());
        assert!(parse("fold").is_err());
        assert!(parse("").is_err());
    }
}
