use crate::{Coords, GridInt};
use crate::sprite::{Block, Sprite};
use crossterm::style::Color;
use Direction::*;

const PLAYER_COLOR: Color = Color::DarkGreen;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub fn offset(self) -> Coords {
        match self {
            Up => (0, -1),
            Down => (0, 1),
            Left => (-1, 0),
            Right => (1, 0),
        }
    }
}

/// The snake. Invariant: never empty, blocks run from the oldest tail
/// segment to the head, and the head is always the last block.
pub struct Player {
    sprite: Sprite,
}

impl Player {
    /// Seeds `length` blocks on a diagonal from `start`, head last. The
    /// diagonal guarantees distinct cells at any length without a check.
    pub fn new(start: Coords, length: usize) -> Self {
        let mut sprite = Sprite::new();
        for i in 0..length as GridInt {
            sprite.push(Block::new((start.0 + i, start.1 + i), Some(PLAYER_COLOR)));
        }
        Player { sprite }
    }

    pub fn sprite(&self) -> &Sprite {
        &self.sprite
    }

    pub fn blocks(&self) -> &[Block] {
        self.sprite.blocks()
    }

    pub fn head(&self) -> Block {
        *self.sprite.blocks().last().unwrap()
    }

    pub fn target_with_offset(&self, dx: GridInt, dy: GridInt) -> Coords {
        let head = self.head().position;
        (head.0 + dx, head.1 + dy)
    }

    /// The slither step: the oldest block drops off and a new head appears
    /// at the offset position. Length is unchanged.
    pub fn move_step(&mut self, dx: GridInt, dy: GridInt) {
        let target = self.target_with_offset(dx, dy);
        self.move_to(target.0, target.1);
    }

    /// Same as `move_step` but with an absolute head position; used when
    /// the new head is on the far side of a wrapped edge.
    pub fn move_to(&mut self, x: GridInt, y: GridInt) {
        self.sprite.remove_oldest();
        self.sprite.push(Block::new((x, y), Some(PLAYER_COLOR)));
    }

    /// Growth: the eaten block is appended as the new head, re-tagged with
    /// the player color, and no tail block drops. This replaces the move
    /// for the tick it happens on.
    pub fn eat(&mut self, block: Block) {
        self.sprite.push(Block::new(block.position, Some(PLAYER_COLOR)));
    }

    /// Does the prospective head position hit the body? The current head
    /// is excluded; every other block, tail tip included, counts.
    pub fn detect_self_collision(&self, pos: Coords) -> bool {
        let blocks = self.sprite.blocks();
        blocks[..blocks.len() - 1].iter().any(|b| b.position == pos)
    }
}
