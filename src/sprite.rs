use crate::Coords;
use crossterm::style::Color;

/// A single occupied grid cell plus a display hint. Blocks are values:
/// movement replaces them, nothing mutates one in place.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Block {
    pub position: Coords,
    pub color: Option<Color>,
}

impl Block {
    pub fn new(position: Coords, color: Option<Color>) -> Self {
        Block { position, color }
    }
}

/// An ordered sequence of blocks making up one entity's footprint.
/// Order is insertion order; the player relies on it (oldest first,
/// head last). Collision queries are pure scans, which is plenty for
/// the grid sizes involved.
#[derive(Clone, Debug, Default)]
pub struct Sprite {
    blocks: Vec<Block>,
}

impl Sprite {
    pub fn new() -> Self {
        Sprite { blocks: vec![] }
    }

    pub fn singular(block: Block) -> Self {
        Sprite { blocks: vec![block] }
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn push(&mut self, block: Block) {
        self.blocks.push(block);
    }

    pub fn remove_oldest(&mut self) -> Option<Block> {
        if self.blocks.is_empty() {
            None
        } else {
            Some(self.blocks.remove(0))
        }
    }

    pub fn contains_position(&self, pos: Coords) -> bool {
        self.blocks.iter().any(|b| b.position == pos)
    }

    pub fn overlaps(&self, other: &Sprite) -> bool {
        self.blocks.iter().any(|b| other.contains_position(b.position))
    }

    pub fn overlaps_block(&self, block: &Block) -> bool {
        self.contains_position(block.position)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ItemKind {
    Food,
    Hazard,
}

impl ItemKind {
    fn color(self) -> Color {
        match self {
            ItemKind::Food => Color::Red,
            ItemKind::Hazard => Color::DarkGrey,
        }
    }
}

/// Single-block entity: a food pellet or a static hazard. Food is removed
/// from the live set the instant the player's head reaches it; hazards are
/// inert and live for the whole round.
#[derive(Clone, Debug)]
pub struct Item {
    kind: ItemKind,
    sprite: Sprite,
}

impl Item {
    pub fn new(kind: ItemKind, position: Coords) -> Self {
        let sprite = Sprite::singular(Block::new(position, Some(kind.color())));
        Item { kind, sprite }
    }

    pub fn kind(&self) -> ItemKind {
        self.kind
    }

    pub fn sprite(&self) -> &Sprite {
        &self.sprite
    }

    pub fn block(&self) -> Block {
        self.sprite.blocks()[0]
    }
}
