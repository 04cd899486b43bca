use anyhow::Result;
use clap::Parser;
use crossterm::{
    cursor::MoveTo,
    style::{style, Attribute, Color, PrintStyledContent},
    QueueableCommand,
};

use std::io::{stdin, stdout, Write};
use std::time::Duration;

use fourline_ai::bitboard::BitBoard;
use fourline_ai::board::{Board, Cell, Dimensions, Mark};
use fourline_ai::mtdf::DriverConfig;
use fourline_ai::player::{AiPlayer, Strategy};

/// Play a connection game against the search engine
#[derive(Parser)]
#[command(version, about)]
struct Args {
    /// Wall-clock budget per AI move in milliseconds
    #[arg(long, default_value_t = 500)]
    budget_ms: u64,
    /// Worker pool size, 0 for one thread per core
    #[arg(long, default_value_t = 0)]
    threads: usize,
    /// Board width in columns
    #[arg(long, default_value_t = fourline_ai::WIDTH)]
    columns: usize,
    /// Board height in rows
    #[arg(long, default_value_t = fourline_ai::HEIGHT)]
    rows: usize,
    /// Length of a winning run
    #[arg(long, default_value_t = fourline_ai::WIN_STREAK)]
    win_streak: usize,
    /// Let the AI control player 1
    #[arg(long)]
    p1_ai: bool,
    /// Let the AI control player 2
    #[arg(long)]
    p2_ai: bool,
}

fn draw<B: Board>(board: &B) -> Result<()> {
    let mut stdout = stdout();

    let cols: String = (1..=board.columns()).map(|x| (x % 10).to_string()).collect();
    stdout.queue(PrintStyledContent(style(cols + "\n")))?;
    for _ in 0..board.rows() {
        stdout.queue(PrintStyledContent(style("\n")))?;
    }
    stdout.flush()?;

    let (origin_x, origin_y) = crossterm::cursor::position()?;

    for index in 0..board.spot_count() {
        let (pos_x, pos_y) = (
            origin_x + (index % board.columns()) as u16,
            origin_y - (index / board.columns()) as u16,
        );

        stdout
            .queue(MoveTo(pos_x, pos_y))?
            .queue(PrintStyledContent(
                style("O")
                    .attribute(Attribute::Bold)
                    .on(Color::DarkBlue)
                    .with(match board.mark_at(index) {
                        Cell::PlayerOne => Color::Red,
                        Cell::PlayerTwo => Color::Yellow,
                        Cell::Empty => Color::DarkBlue,
                    }),
            ))?;
    }
    stdout
        .queue(MoveTo(origin_x + board.columns() as u16, origin_y))?
        .queue(PrintStyledContent(style("\n")))?;
    stdout.flush()?;
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let dims = Dimensions {
        columns: args.columns,
        rows: args.rows,
        win_streak: args.win_streak,
    };
    let mut board = BitBoard::with_dims(dims)?;

    let config = DriverConfig {
        budget: Duration::from_millis(args.budget_ms),
        threads: args.threads,
        ..DriverConfig::default()
    };
    let mut ai_one = if args.p1_ai {
        Some(AiPlayer::new(config.clone())?)
    } else {
        None
    };
    let mut ai_two = if args.p2_ai {
        Some(AiPlayer::new(config.clone())?)
    } else {
        None
    };

    let stdin = stdin();
    let mut mark = Mark::PlayerOne;

    println!("Welcome to Fourline\n");

    // game loop
    loop {
        draw(&board)?;

        let ai = match mark {
            Mark::PlayerOne => ai_one.as_mut(),
            Mark::PlayerTwo => ai_two.as_mut(),
        };
        let next_move = match ai {
            // AI player
            Some(player) => {
                println!("AI is thinking...");
                stdout().flush().expect("failed to flush to stdout!");

                let column = player.determine_move(&board, mark)?;
                println!("Best move: {}", column + 1);
                column
            }
            // human player
            None => {
                print!("Move input > ");
                stdout().flush().expect("failed to flush to stdout!");
                let mut input_str = String::new();
                stdin.read_line(&mut input_str)?;

                match input_str.trim().parse::<usize>() {
                    Ok(column @ 1..) if column <= board.columns() => column - 1,
                    _ => {
                        println!("Invalid column: {}", input_str.trim());
                        continue;
                    }
                }
            }
        };

        if let Err(err) = board.play(next_move, mark) {
            println!("{}", err);
            // try the move again
            continue;
        }

        if board.has_won(mark) {
            draw(&board)?;
            let player = match mark {
                Mark::PlayerOne => 1,
                Mark::PlayerTwo => 2,
            };
            println!("Player {} wins!", player);
            break;
        }
        if board.is_full() {
            draw(&board)?;
            println!("Draw!");
            break;
        }

        mark = mark.other();
    }

    let game: String = board
        .moves()
        .iter()
        .map(|&(column, _)| ((column + 1) % 10).to_string())
        .collect();
    println!("Game: {}", game);

    Ok(())
}
