use std::time::{Duration, Instant};

use crate::{Coords, GridInt};
use crate::player::{Direction, Player};
use crate::sprite::{Item, ItemKind};

use rand::rngs::ThreadRng;
use rand::Rng;
use thiserror::Error;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Status {
    Running,
    Won,
    Lost,
}

#[derive(Copy, Clone, Debug)]
pub struct GameConfig {
    pub cells_x: GridInt,
    pub cells_y: GridInt,
    pub num_food: usize,
    pub num_hazards: usize,
    pub initial_player_length: usize,
    pub ticks_per_second: u64,
}

impl Default for GameConfig {
    fn default() -> Self {
        GameConfig {
            cells_x: 40,
            cells_y: 40,
            num_food: 10,
            num_hazards: 5,
            initial_player_length: 6,
            ticks_per_second: 20,
        }
    }
}

impl GameConfig {
    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(1000 / self.ticks_per_second)
    }

    /// Placement uses an unbounded rejection loop, so the grid has to keep
    /// a comfortable margin of empty cells over everything placed on it.
    /// That precondition is checked here, once, instead of capping retries.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cells_x < 1 || self.cells_y < 1 {
            return Err(ConfigError::EmptyGrid);
        }
        if self.ticks_per_second == 0 || self.ticks_per_second > 1000 {
            return Err(ConfigError::BadTickRate);
        }
        if self.initial_player_length == 0 {
            return Err(ConfigError::NoPlayer);
        }
        if self.num_food == 0 {
            return Err(ConfigError::NoFood);
        }

        // Checked in usize so an oversized length cannot truncate its way
        // past the fit test
        let (cells_x, cells_y) = (self.cells_x as usize, self.cells_y as usize);
        if cells_x / 2 + self.initial_player_length > cells_x
            || cells_y / 2 + self.initial_player_length > cells_y
        {
            return Err(ConfigError::PlayerOutOfBounds {
                length: self.initial_player_length,
                cells_x: self.cells_x,
                cells_y: self.cells_y,
            });
        }

        let cells = cells_x * cells_y;
        let required = self.num_food + self.num_hazards + self.initial_player_length;
        if required * 2 > cells {
            return Err(ConfigError::GridTooSmall {
                required,
                cells_x: self.cells_x,
                cells_y: self.cells_y,
            });
        }

        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("grid must be at least 1x1")]
    EmptyGrid,
    #[error("tick rate must be between 1 and 1000 per second")]
    BadTickRate,
    #[error("initial player length must be at least 1")]
    NoPlayer,
    #[error("at least 1 food item is required, the round could never be won without")]
    NoFood,
    #[error("player of length {length} does not fit diagonally from the center of a {cells_x}x{cells_y} grid")]
    PlayerOutOfBounds {
        length: usize,
        cells_x: GridInt,
        cells_y: GridInt,
    },
    #[error("{required} occupied cells leave no placement margin on a {cells_x}x{cells_y} grid")]
    GridTooSmall {
        required: usize,
        cells_x: GridInt,
        cells_y: GridInt,
    },
}

/// The simulation state machine. The shell feeds it direction commands and
/// per-frame `tick` calls; it owns the player, the live food and hazard
/// sets, and the round status. The RNG is injected so tests can reproduce
/// exact placement layouts.
pub struct Game<R = ThreadRng> {
    config: GameConfig,
    interval: Duration,
    player: Player,
    foods: Vec<Item>,
    hazards: Vec<Item>,
    direction: Option<Direction>,
    status: Status,
    last_time: Option<Instant>,
    rng: R,
}

impl Game<ThreadRng> {
    pub fn new(config: GameConfig) -> Result<Self, ConfigError> {
        Game::with_rng(config, rand::thread_rng())
    }
}

impl<R: Rng> Game<R> {
    pub fn with_rng(config: GameConfig, rng: R) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut game = Game {
            config,
            interval: config.frame_interval(),
            player: Self::seed_player(&config),
            foods: vec![],
            hazards: vec![],
            direction: None,
            status: Status::Running,
            last_time: None,
            rng,
        };
        game.set_food_positions();
        game.set_hazard_positions();
        Ok(game)
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn player(&self) -> &Player {
        &self.player
    }

    pub fn foods(&self) -> &[Item] {
        &self.foods
    }

    pub fn hazards(&self) -> &[Item] {
        &self.hazards
    }

    pub fn direction(&self) -> Option<Direction> {
        self.direction
    }

    /// Latches a direction for the next tick. Last write before the tick
    /// wins; an in-flight tick is never affected retroactively.
    pub fn set_direction(&mut self, direction: Direction) {
        self.direction = Some(direction);
    }

    /// Advances the clock. A step fires once the elapsed time since the
    /// previous committed step exceeds the frame interval; the excess is
    /// carried over so ticks do not drift under irregular callbacks.
    /// Returns whether a step was committed. No-op in a terminal status.
    pub fn tick(&mut self, now: Instant) -> bool {
        if self.status != Status::Running {
            return false;
        }

        let last = match self.last_time {
            Some(t) => t,
            None => {
                self.last_time = Some(now);
                return false;
            }
        };

        let elapsed = now.saturating_duration_since(last);
        if elapsed <= self.interval {
            return false;
        }

        let carry = Duration::from_nanos((elapsed.as_nanos() % self.interval.as_nanos()) as u64);
        self.last_time = Some(now - carry);
        self.advance();
        true
    }

    /// Starts a fresh round. Only meaningful from a terminal status;
    /// while running this does nothing.
    pub fn restart(&mut self) {
        if self.status == Status::Running {
            return;
        }

        self.player = Self::seed_player(&self.config);
        self.foods.clear();
        self.hazards.clear();
        self.set_food_positions();
        self.set_hazard_positions();
        self.direction = None;
        self.status = Status::Running;
        self.last_time = None;
    }

    ///////////////////////////////////////////////////////////////////////////

    fn seed_player(config: &GameConfig) -> Player {
        let center = (config.cells_x / 2, config.cells_y / 2);
        Player::new(center, config.initial_player_length)
    }

    // Rejection sampling: draw a uniform cell, redraw while it lands on the
    // player or an already-placed food. All food is placed before hazards.
    fn set_food_positions(&mut self) {
        for _ in 0..self.config.num_food {
            loop {
                let item = Item::new(ItemKind::Food, self.random_cell());
                let blocked = item.sprite().overlaps(self.player.sprite())
                    || self.foods.iter().any(|f| f.sprite().overlaps_block(&item.block()));
                if !blocked {
                    self.foods.push(item);
                    break;
                }
            }
        }
    }

    // Hazards additionally reject cells taken by food; two hazards may
    // stack, which is harmless since both are inert.
    fn set_hazard_positions(&mut self) {
        for _ in 0..self.config.num_hazards {
            loop {
                let item = Item::new(ItemKind::Hazard, self.random_cell());
                let blocked = item.sprite().overlaps(self.player.sprite())
                    || self.foods.iter().any(|f| f.sprite().overlaps_block(&item.block()));
                if !blocked {
                    self.hazards.push(item);
                    break;
                }
            }
        }
    }

    fn random_cell(&mut self) -> Coords {
        (
            self.rng.gen_range(0..self.config.cells_x),
            self.rng.gen_range(0..self.config.cells_y),
        )
    }

    // One simulation step. The order is load-bearing: hazard check, then
    // food, then self-collision, then the move commit. Eating replaces the
    // move for that tick, and winning is detected the moment the last food
    // is consumed.
    fn advance(&mut self) {
        let (dx, dy) = match self.direction {
            Some(d) => d.offset(),
            None => return, // no command yet, the player stays put
        };

        let raw = self.player.target_with_offset(dx, dy);
        let target = self.wrap(raw);

        if self.hazards.iter().any(|h| h.sprite().contains_position(target)) {
            self.status = Status::Lost;
            return;
        }

        if let Some(idx) = self.foods.iter().position(|f| f.sprite().contains_position(target)) {
            let food = self.foods.remove(idx);
            self.player.eat(food.block());
            if self.foods.is_empty() {
                self.status = Status::Won;
            }
            return;
        }

        if self.player.detect_self_collision(target) {
            self.status = Status::Lost;
            return;
        }

        if target == raw {
            self.player.move_step(dx, dy);
        } else {
            self.player.move_to(target.0, target.1);
        }
    }

    // Toroidal boundary policy. The branches are mutually exclusive on
    // purpose: only one axis is corrected per tick. Movement is one axis
    // at a time, so a simultaneous x and y violation cannot happen here.
    fn wrap(&self, (mut x, mut y): Coords) -> Coords {
        if x < 0 {
            x = self.config.cells_x - 1;
        } else if x > self.config.cells_x - 1 {
            x = 0;
        } else if y < 0 {
            y = self.config.cells_y - 1;
        } else if y > self.config.cells_y - 1 {
            y = 0;
        }
        (x, y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::Direction::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const SEED: u64 = 0x5EED_CAFE;

    fn small_config() -> GameConfig {
        GameConfig {
            cells_x: 5,
            cells_y: 5,
            num_food: 1,
            num_hazards: 0,
            initial_player_length: 1,
            ticks_per_second: 20,
        }
    }

    fn seeded(config: GameConfig) -> Game<StdRng> {
        Game::with_rng(config, StdRng::seed_from_u64(SEED)).unwrap()
    }

    // Arms the clock and returns a timestamp that fires a step every time
    // it is advanced by it.
    fn arm(game: &mut Game<StdRng>) -> (Instant, Duration) {
        let now = Instant::now();
        assert!(!game.tick(now));
        (now, game.config().frame_interval() * 2)
    }

    fn step(game: &mut Game<StdRng>, now: &mut Instant, stride: Duration) -> bool {
        *now += stride;
        game.tick(*now)
    }

    fn head(game: &Game<StdRng>) -> Coords {
        game.player().head().position
    }

    #[test]
    fn placement_respects_occupancy() {
        let game = seeded(GameConfig::default());

        assert_eq!(game.foods().len(), 10);
        assert_eq!(game.hazards().len(), 5);

        for food in game.foods() {
            assert!(!food.sprite().overlaps(game.player().sprite()));
        }
        for hazard in game.hazards() {
            assert!(!hazard.sprite().overlaps(game.player().sprite()));
            for food in game.foods() {
                assert!(!hazard.sprite().overlaps(food.sprite()));
            }
        }
        // No two food pellets share a cell
        for (i, a) in game.foods().iter().enumerate() {
            for b in &game.foods()[i + 1..] {
                assert!(!a.sprite().overlaps(b.sprite()));
            }
        }
    }

    #[test]
    fn placement_is_deterministic_for_a_seed() {
        let a = seeded(GameConfig::default());
        let b = seeded(GameConfig::default());

        let cells = |items: &[Item]| items.iter().map(|i| i.block().position).collect::<Vec<_>>();
        assert_eq!(cells(a.foods()), cells(b.foods()));
        assert_eq!(cells(a.hazards()), cells(b.hazards()));
    }

    #[test]
    fn eating_the_last_food_wins_on_the_same_tick() {
        let mut game = seeded(small_config());
        game.foods = vec![Item::new(ItemKind::Food, (2, 3))];

        assert_eq!(head(&game), (2, 2));
        game.set_direction(Down);
        let (mut now, stride) = arm(&mut game);
        assert!(step(&mut game, &mut now, stride));

        assert_eq!(head(&game), (2, 3));
        assert!(game.foods().is_empty());
        assert_eq!(game.status(), Status::Won);
        // Growth instead of a slither: length went from 1 to 2
        assert_eq!(game.player().blocks().len(), 2);
    }

    #[test]
    fn eating_keeps_running_while_food_remains() {
        let mut game = seeded(small_config());
        game.foods = vec![
            Item::new(ItemKind::Food, (2, 3)),
            Item::new(ItemKind::Food, (0, 0)),
        ];

        game.set_direction(Down);
        let (mut now, stride) = arm(&mut game);
        assert!(step(&mut game, &mut now, stride));

        assert_eq!(game.status(), Status::Running);
        assert_eq!(game.foods().len(), 1);
        assert_eq!(game.foods()[0].block().position, (0, 0));
        assert_eq!(game.player().blocks().len(), 2);
    }

    #[test]
    fn hazard_contact_loses() {
        let mut game = seeded(small_config());
        game.foods = vec![Item::new(ItemKind::Food, (0, 0))];
        game.hazards = vec![Item::new(ItemKind::Hazard, (2, 3))];

        game.set_direction(Down);
        let (mut now, stride) = arm(&mut game);
        assert!(step(&mut game, &mut now, stride));

        assert_eq!(game.status(), Status::Lost);
        // The fatal move is never committed
        assert_eq!(head(&game), (2, 2));
    }

    #[test]
    fn hazard_takes_priority_over_food_on_the_same_cell() {
        let mut game = seeded(small_config());
        game.foods = vec![Item::new(ItemKind::Food, (2, 3))];
        game.hazards = vec![Item::new(ItemKind::Hazard, (2, 3))];

        game.set_direction(Down);
        let (mut now, stride) = arm(&mut game);
        assert!(step(&mut game, &mut now, stride));

        assert_eq!(game.status(), Status::Lost);
        assert_eq!(game.foods().len(), 1);
    }

    #[test]
    fn running_into_the_body_loses() {
        let mut game = seeded(GameConfig {
            initial_player_length: 3,
            ..small_config()
        });
        game.foods = vec![Item::new(ItemKind::Food, (0, 0))];

        // Diagonal seed from (2, 2): body (2,2) (3,3) (4,4), head (4,4).
        // Hook left then up so the head aims back into (3, 3).
        game.set_direction(Left);
        let (mut now, stride) = arm(&mut game);
        assert!(step(&mut game, &mut now, stride));
        assert_eq!(head(&game), (3, 4));
        assert_eq!(game.status(), Status::Running);

        game.set_direction(Up);
        assert!(step(&mut game, &mut now, stride));
        assert_eq!(game.status(), Status::Lost);
        assert_eq!(head(&game), (3, 4));
    }

    #[test]
    fn wraps_around_every_edge_one_axis_at_a_time() {
        let cases = [
            ((0, 2), Left, (4, 2)),
            ((4, 2), Right, (0, 2)),
            ((2, 0), Up, (2, 4)),
            ((2, 4), Down, (2, 0)),
        ];

        for &(start, direction, expected) in cases.iter() {
            let mut game = seeded(small_config());
            game.foods = vec![Item::new(ItemKind::Food, (1, 1))];
            game.player = Player::new(start, 1);

            game.set_direction(direction);
            let (mut now, stride) = arm(&mut game);
            assert!(step(&mut game, &mut now, stride));
            assert_eq!(head(&game), expected);
            assert_eq!(game.status(), Status::Running);
        }
    }

    #[test]
    fn interior_moves_do_not_wrap() {
        let mut game = seeded(small_config());
        game.foods = vec![Item::new(ItemKind::Food, (0, 0))];

        game.set_direction(Right);
        let (mut now, stride) = arm(&mut game);
        assert!(step(&mut game, &mut now, stride));
        assert_eq!(head(&game), (3, 2));
    }

    #[test]
    fn tick_respects_the_frame_interval_with_carry_over() {
        let mut game = seeded(small_config());
        game.foods = vec![Item::new(ItemKind::Food, (0, 0))];
        game.set_direction(Right);

        let interval = game.config().frame_interval();
        let start = Instant::now();
        assert!(!game.tick(start)); // arming call

        // Half an interval: nothing yet
        assert!(!game.tick(start + interval / 2));
        // An interval and a half: fires, excess half carried over
        assert!(game.tick(start + interval * 3 / 2));
        assert_eq!(head(&game), (3, 2));
        // Just past two intervals: one interval since the carried-over
        // reference point has elapsed, so this fires too
        assert!(game.tick(start + interval * 2 + Duration::from_millis(1)));
        assert_eq!(head(&game), (4, 2));
    }

    #[test]
    fn direction_is_latched_last_write_wins() {
        let mut game = seeded(small_config());
        game.foods = vec![Item::new(ItemKind::Food, (0, 0))];

        game.set_direction(Down);
        game.set_direction(Up);
        let (mut now, stride) = arm(&mut game);
        assert!(step(&mut game, &mut now, stride));
        assert_eq!(head(&game), (2, 1));
    }

    #[test]
    fn no_movement_before_the_first_command() {
        let mut game = seeded(small_config());
        game.foods = vec![Item::new(ItemKind::Food, (0, 0))];

        let (mut now, stride) = arm(&mut game);
        assert!(step(&mut game, &mut now, stride));
        assert_eq!(head(&game), (2, 2));
        assert_eq!(game.status(), Status::Running);
    }

    #[test]
    fn terminal_status_freezes_the_game() {
        let mut game = seeded(small_config());
        game.foods = vec![Item::new(ItemKind::Food, (2, 3))];
        game.set_direction(Down);
        let (mut now, stride) = arm(&mut game);
        assert!(step(&mut game, &mut now, stride));
        assert_eq!(game.status(), Status::Won);

        let frozen_head = head(&game);
        let frozen_len = game.player().blocks().len();
        for _ in 0..5 {
            assert!(!step(&mut game, &mut now, stride));
        }
        assert_eq!(head(&game), frozen_head);
        assert_eq!(game.player().blocks().len(), frozen_len);
        assert_eq!(game.status(), Status::Won);
    }

    #[test]
    fn restart_reenters_running_with_fresh_entities() {
        let mut game = seeded(small_config());
        game.foods = vec![Item::new(ItemKind::Food, (0, 0))];
        game.hazards = vec![Item::new(ItemKind::Hazard, (2, 3))];

        game.set_direction(Down);
        let (mut now, stride) = arm(&mut game);
        assert!(step(&mut game, &mut now, stride));
        assert_eq!(game.status(), Status::Lost);

        game.restart();
        assert_eq!(game.status(), Status::Running);
        assert_eq!(game.player().blocks().len(), 1);
        assert_eq!(head(&game), (2, 2));
        assert_eq!(game.foods().len(), 1);
        assert_eq!(game.direction(), None);
        for food in game.foods() {
            assert!(!food.sprite().overlaps(game.player().sprite()));
        }
    }

    #[test]
    fn restart_while_running_is_a_no_op() {
        let mut game = seeded(small_config());
        game.foods = vec![Item::new(ItemKind::Food, (0, 0))];
        game.set_direction(Right);

        game.restart();
        assert_eq!(game.status(), Status::Running);
        assert_eq!(game.direction(), Some(Right));
        assert_eq!(game.foods()[0].block().position, (0, 0));
    }

    #[test]
    fn config_validation_rejects_bad_setups() {
        let degenerate = GameConfig {
            cells_x: 0,
            ..GameConfig::default()
        };
        assert!(matches!(degenerate.validate(), Err(ConfigError::EmptyGrid)));

        let too_fast = GameConfig {
            ticks_per_second: 2000,
            ..GameConfig::default()
        };
        assert!(matches!(too_fast.validate(), Err(ConfigError::BadTickRate)));

        let no_player = GameConfig {
            initial_player_length: 0,
            ..GameConfig::default()
        };
        assert!(matches!(no_player.validate(), Err(ConfigError::NoPlayer)));

        let no_food = GameConfig {
            num_food: 0,
            ..GameConfig::default()
        };
        assert!(matches!(no_food.validate(), Err(ConfigError::NoFood)));

        let oversized_player = GameConfig {
            initial_player_length: 4,
            ..small_config()
        };
        assert!(matches!(
            oversized_player.validate(),
            Err(ConfigError::PlayerOutOfBounds { .. })
        ));

        let crowded = GameConfig {
            cells_x: 4,
            cells_y: 4,
            num_food: 6,
            num_hazards: 2,
            initial_player_length: 1,
            ticks_per_second: 20,
        };
        assert!(matches!(crowded.validate(), Err(ConfigError::GridTooSmall { .. })));

        assert!(GameConfig::default().validate().is_ok());
        assert!(small_config().validate().is_ok());
    }

    // A length that would truncate to 0 through the grid coordinate type
    // must still be rejected, not slip through and seed an empty player
    #[test]
    fn config_validation_rejects_lengths_wider_than_the_coordinate_type() {
        let truncating = GameConfig {
            cells_x: 400,
            cells_y: 400,
            initial_player_length: 1 << 16,
            ..GameConfig::default()
        };
        assert!(matches!(
            truncating.validate(),
            Err(ConfigError::PlayerOutOfBounds { .. })
        ));
        assert!(Game::with_rng(truncating, StdRng::seed_from_u64(SEED)).is_err());
    }
}
