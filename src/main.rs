use bridges_game::frameworks::config;
use bridges_game::{Game, GameContext, KeyId, NamedColor, NamedSymbol};

const ROWS: usize = 12;
const COLS: usize = 12;
const TRAIL: [NamedColor; 4] = [
    NamedColor::Gold,
    NamedColor::Tomato,
    NamedColor::Mediumseagreen,
    NamedColor::Cornflowerblue,
];

// Demo: steer a ship with the arrows or WASD, hold space to paint, q to quit.
struct PaintShip {
    row: usize,
    col: usize,
    color: usize,
}

impl PaintShip {
    fn steer(&mut self, ctx: &GameContext) {
        let pressed = |a: &KeyId, b: &KeyId| ctx.key_just_pressed(a) || ctx.key_just_pressed(b);

        if pressed(&KeyId::UP, &KeyId::W) {
            self.row = self.row.checked_sub(1).unwrap_or(ctx.board_height() - 1);
        }
        if pressed(&KeyId::DOWN, &KeyId::S) {
            self.row = (self.row + 1) % ctx.board_height();
        }
        if pressed(&KeyId::LEFT, &KeyId::A) {
            self.col = self.col.checked_sub(1).unwrap_or(ctx.board_width() - 1);
        }
        if pressed(&KeyId::RIGHT, &KeyId::D) {
            self.col = (self.col + 1) % ctx.board_width();
        }
    }
}

impl Game for PaintShip {
    fn initialize(&mut self, ctx: &mut GameContext) {
        ctx.set_title("Paint ship");
        ctx.set_description("Arrows or WASD move, hold space to paint, q quits.");
        if let Err(e) = ctx.set_key_fire_cooldown(&KeyId::SPACE, 5) {
            tracing::warn!(error = %e, "keeping default paint rate");
        }
    }

    fn game_loop(&mut self, ctx: &mut GameContext) {
        if ctx.key_just_pressed(&KeyId::Q) {
            ctx.quit();
            return;
        }

        if let Err(e) = ctx.set_symbol(self.row, self.col, NamedSymbol::None) {
            tracing::warn!(error = %e, "could not clear the ship");
        }
        self.steer(ctx);

        if ctx.key_fire(&KeyId::SPACE) {
            self.color = (self.color + 1) % TRAIL.len();
            if let Err(e) = ctx.set_bg_color(self.row, self.col, TRAIL[self.color]) {
                tracing::warn!(error = %e, "could not paint the trail");
            }
        }
        let ship = ctx.draw_symbol(self.row, self.col, NamedSymbol::TriangleUp, NamedColor::White);
        if let Err(e) = ship {
            tracing::warn!(error = %e, "could not draw the ship");
        }
    }
}

#[tokio::main]
async fn main() {
    bridges_game::init_runtime();

    let credentials = match config::credentials_from_env() {
        Ok(credentials) => credentials,
        Err(e) => {
            tracing::error!(error = %e, "set BRIDGES_USER, BRIDGES_API_KEY and BRIDGES_ASSIGNMENT");
            std::process::exit(2);
        }
    };

    let mut game = PaintShip {
        row: ROWS / 2,
        col: COLS / 2,
        color: 0,
    };
    match bridges_game::run_game(credentials, ROWS, COLS, &mut game).await {
        Ok(reason) => tracing::info!(%reason, "game over"),
        Err(_) => std::process::exit(1),
    }
}
