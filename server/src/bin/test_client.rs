use clap::Parser;
use log::info;
use moab_shared::ServerMessage;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

#[derive(Parser, Debug)]
#[clap(author, version, about = "Interactive terminal client for the MOAB server")]
struct Args {
    /// Server address to connect to
    #[clap(short = 's', long, default_value = "127.0.0.1:8080")]
    server: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args = Args::parse();

    let stream = TcpStream::connect(&args.server).await?;
    info!("Connected to {}", args.server);
    println!("Connected to {}", args.server);
    println!("Commands: REG <name> <x> <y> <-|>   BOMB <x> <y>");

    let (read_half, mut write_half) = stream.into_split();
    let mut server_lines = BufReader::new(read_half).lines();
    let mut input_lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = server_lines.next_line() => match line? {
                Some(line) => println!("{}", describe(&line)),
                None => {
                    println!("Server closed the connection");
                    break;
                }
            },

            input = input_lines.next_line() => match input? {
                Some(input) => {
                    write_half.write_all(format!("{}\n", input.trim_end()).as_bytes()).await?;
                }
                None => break,
            },
        }
    }

    Ok(())
}

// Human readable rendering of a server line
fn describe(line: &str) -> String {
    match line.parse::<ServerMessage>() {
        Ok(ServerMessage::Welcome) => "Registered, your ship is on the board".to_string(),
        Ok(ServerMessage::Taken) => "That name is already taken".to_string(),
        Ok(ServerMessage::Invalid) => "Invalid command".to_string(),
        Ok(ServerMessage::Join { name }) => format!("{} joined the battle", name),
        Ok(ServerMessage::Hit {
            attacker,
            x,
            y,
            owner,
        }) => format!("{} hit {} at ({}, {})", attacker, owner, x, y),
        Ok(ServerMessage::Miss { attacker, x, y }) => {
            format!("{} missed at ({}, {})", attacker, x, y)
        }
        Ok(ServerMessage::Gg { name }) => format!("{} is out", name),
        Err(_) => format!("? {}", line),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_events() {
        assert_eq!(describe("HIT B 2 4 A"), "B hit A at (2, 4)");
        assert_eq!(describe("MISS B 0 0"), "B missed at (0, 0)");
        assert_eq!(describe("GG A"), "A is out");
        assert_eq!(describe("JOIN C"), "C joined the battle");
        assert_eq!(describe("WELCOME"), "Registered, your ship is on the board");
    }

    #[test]
    fn test_args_server_flag() {
        let args = Args::try_parse_from(["test_client"]).unwrap();
        assert_eq!(args.server, "127.0.0.1:8080");

        let args = Args::try_parse_from(["test_client", "-s", "10.0.0.2:9000"]).unwrap();
        assert_eq!(args.server, "10.0.0.2:9000");
    }

    #[test]
    fn test_describe_unknown_line() {
        assert_eq!(describe("PING"), "? PING");
    }
}
