use std::{cmp::min, mem, process::exit, thread::sleep, time::{Duration, Instant}};

use crate::{Coords, GridInt};
use crate::game::{Game, GameConfig, Status};
use crate::player::Direction::*;
use crate::sprite::ItemKind;
use crate::term::{ScreenInt, ScreenPos, TermManager};

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

const POLL_INTERVAL_MS: u64 = 5;

const PLAYER_BODY_CHAR: char = '█';
const FOOD_CHAR: char = 'O';
const HAZARD_CHAR: char = '#';
const DEAD_PLAYER_CHAR: char = 'X';

/// Rendering/input shell around the simulation engine: translates key
/// events into direction commands, drives the tick clock, and draws the
/// entity blocks the engine exposes.
pub struct Shell {
    game: Game,
    term: TermManager,
    paused: bool,
    drawn: Vec<Coords>,
    frame_count: u64,
    round_start: Instant,
}

impl Shell {
    pub fn new() -> Self {
        let term = TermManager::new();
        let (w, h) = term.get_terminal_size();

        // Default grid, shrunk to whatever fits inside the borders
        let defaults = GameConfig::default();
        let config = GameConfig {
            cells_x: min(w.saturating_sub(2), defaults.cells_x as ScreenInt) as GridInt,
            cells_y: min(h.saturating_sub(2), defaults.cells_y as ScreenInt) as GridInt,
            ..defaults
        };

        let game = match Game::new(config) {
            Ok(game) => game,
            Err(err) => {
                eprintln!("{}", err);
                exit(1);
            }
        };

        Shell {
            game,
            term,
            paused: false,
            drawn: vec![],
            frame_count: 0,
            round_start: Instant::now(),
        }
    }

    pub fn initialize(&mut self) {
        self.term.setup();
    }

    pub fn show_intro(&mut self) {
        let lines = &[
            "Arrow keys or WASD to move",
            "Eat every pellet, dodge the #s",
            "The edges wrap around",
            "Esc to pause",
            "CTRL+C to quit",
            "",
            "Press any key to begin"
        ];

        self.term.show_message(lines);

        if is_ctrl_c(&self.term.read_key_blocking()) {
            self.clean_exit()
        }

        self.term.hide_message();
    }

    /// Runs one round to its terminal status, then waits for a key to
    /// either restart or quit.
    pub fn play(&mut self) {
        self.term.clear();
        let field = self.playfield_size();
        self.term.draw_borders(Some(field));
        self.term.hide_message();

        if self.game.status() != Status::Running {
            self.game.restart();
        }
        self.drawn.clear();
        self.frame_count = 0;
        self.round_start = Instant::now();
        self.redraw();

        loop {
            sleep(Duration::from_millis(POLL_INTERVAL_MS));

            for key_ev in self.term.read_key_events_queue() {
                match &key_ev {
                    ev if is_ctrl_c(ev) => self.clean_exit(),
                    KeyEvent { code, modifiers: _ } => match code {
                        KeyCode::Char('w') | KeyCode::Up => self.game.set_direction(Up),
                        KeyCode::Char('a') | KeyCode::Left => self.game.set_direction(Left),
                        KeyCode::Char('s') | KeyCode::Down => self.game.set_direction(Down),
                        KeyCode::Char('d') | KeyCode::Right => self.game.set_direction(Right),
                        KeyCode::Esc => self.toggle_pause(),
                        _ => {} // anything else leaves the latched direction alone
                    }
                }
            }

            if self.paused { continue; }

            if self.game.tick(Instant::now()) {
                self.frame_count += 1;
                self.redraw();
                self.draw_fps();

                match self.game.status() {
                    Status::Running => {},
                    status => {
                        self.game_over(status);
                        break;
                    },
                }
            }
        }

        // Quit if the user CTRL+C's after the round
        if is_ctrl_c(&self.term.read_key_blocking()) {
            self.clean_exit()
        }
    }

    ///////////////////////////////////////////////////////////////////////////

    fn clean_exit(&mut self) {
        self.term.restore();
        exit(0);
    }

    fn playfield_size(&self) -> ScreenPos {
        let config = self.game.config();
        (config.cells_x as ScreenInt + 2, config.cells_y as ScreenInt + 2)
    }

    // Grid cell -> screen cell, offset past the border
    fn to_screen(pos: Coords) -> ScreenPos {
        (pos.0 as ScreenInt + 1, pos.1 as ScreenInt + 1)
    }

    fn item_char(kind: ItemKind) -> char {
        match kind {
            ItemKind::Food => FOOD_CHAR,
            ItemKind::Hazard => HAZARD_CHAR,
        }
    }

    fn head_char(&self) -> char {
        match self.game.direction() {
            Some(Up) => '^',
            Some(Down) => 'v',
            Some(Left) => '<',
            Some(Right) => '>',
            None => PLAYER_BODY_CHAR,
        }
    }

    fn redraw(&mut self) {
        let mut drawn = mem::take(&mut self.drawn);
        for pos in drawn.drain(..) {
            self.term.print_at(Self::to_screen(pos), ' ');
        }

        // Hazards first, then food, then the player, so the player
        // overpaints the cell it just consumed
        for item in self.game.hazards().iter().chain(self.game.foods()) {
            let block = item.block();
            self.term.print_cell(Self::to_screen(block.position), Self::item_char(item.kind()), block.color);
            drawn.push(block.position);
        }

        let head_char = self.head_char();
        let blocks = self.game.player().blocks();
        let head_idx = blocks.len() - 1;
        for (i, block) in blocks.iter().enumerate() {
            let ch = if i == head_idx { head_char } else { PLAYER_BODY_CHAR };
            self.term.print_cell(Self::to_screen(block.position), ch, block.color);
            drawn.push(block.position);
        }

        self.drawn = drawn;
        self.term.flush();
    }

    // Committed steps per second since the round began; a shell-side
    // readout, not part of the engine's contract
    fn draw_fps(&mut self) {
        let elapsed = self.round_start.elapsed().as_secs_f64();
        if elapsed <= 0.0 {
            return;
        }

        let label = format!("FPS: {:.2}", self.frame_count as f64 / elapsed);
        let (w, h) = self.term.get_terminal_size();
        let x = w.saturating_sub(label.len() as ScreenInt + 1);
        self.term.print_str((x, h - 1), &label);
        self.term.flush();
    }

    fn game_over(&mut self, status: Status) {
        let score = self.game.player().blocks().len() - self.game.config().initial_player_length;

        if status == Status::Lost {
            let positions: Vec<Coords> =
                self.game.player().blocks().iter().map(|b| b.position).collect();
            for pos in positions {
                self.term.print_at(Self::to_screen(pos), DEAD_PLAYER_CHAR);
            }
        }

        let headline = if status == Status::Won { "You won!" } else { "Try again!" };

        self.term.show_message(&[
            headline,
            &*format!("Score: {}", score),
            "",
            "Press any key to play again,",
            "or CTRL+C to quit."
        ]);
    }

    fn toggle_pause(&mut self) {
        if !self.paused {
            self.term.show_message(&["Paused", "Press Esc to resume", "or Ctrl+C to quit"]);
        } else {
            self.term.hide_message();
        }

        self.paused = !self.paused;
    }
}

fn is_ctrl_c(ev: &KeyEvent) -> bool {
    matches!(ev, KeyEvent { code: KeyCode::Char('c'), modifiers: KeyModifiers::CONTROL })
}
