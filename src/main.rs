mod game;
mod player;
mod shell;
mod sprite;
mod term;

// Grid coordinates are signed: a prospective head position reaches -1
// before the wrap-around correction pulls it back onto the torus.
pub type GridInt = i16;
pub type Coords = (GridInt, GridInt);

fn main() {
    let mut shell = shell::Shell::new();
    shell.initialize();
    shell.show_intro();

    loop {
        // One round per iteration; exits cleanly on CTRL+C
        shell.play();
    }
}
