// Board model: a rows x cols grid of cells with named colors and symbols.

use crate::domain::errors::{BoardError, ConfigError};

/// Largest board the game server renders.
pub const MAX_BOARD_CELLS: usize = 1024;

// Generates a palette enum whose discriminants are the wire indices.
macro_rules! palette {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $wire:literal,)+ }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u8)]
        pub enum $name {
            $($variant,)+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant,)+];

            pub fn index(self) -> u8 {
                self as u8
            }

            pub fn name(self) -> &'static str {
                match self {
                    $($name::$variant => $wire,)+
                }
            }

            pub fn from_name(name: &str) -> Option<Self> {
                match name {
                    $($wire => Some($name::$variant),)+
                    _ => None,
                }
            }
        }
    };
}

palette! {
    /// CSS named colors understood by the game board renderer.
    NamedColor {
        Aliceblue => "aliceblue",
        Antiquewhite => "antiquewhite",
        Aqua => "aqua",
        Aquamarine => "aquamarine",
        Azure => "azure",
        Beige => "beige",
        Bisque => "bisque",
        Black => "black",
        Blanchedalmond => "blanchedalmond",
        Blue => "blue",
        Blueviolet => "blueviolet",
        Brown => "brown",
        Burlywood => "burlywood",
        Cadetblue => "cadetblue",
        Chartreuse => "chartreuse",
        Chocolate => "chocolate",
        Coral => "coral",
        Cornflowerblue => "cornflowerblue",
        Cornsilk => "cornsilk",
        Crimson => "crimson",
        Cyan => "cyan",
        Darkblue => "darkblue",
        Darkcyan => "darkcyan",
        Darkgoldenrod => "darkgoldenrod",
        Darkgray => "darkgray",
        Darkgreen => "darkgreen",
        Darkgrey => "darkgrey",
        Darkkhaki => "darkkhaki",
        Darkmagenta => "darkmagenta",
        Darkolivegreen => "darkolivegreen",
        Darkorange => "darkorange",
        Darkorchid => "darkorchid",
        Darkred => "darkred",
        Darksalmon => "darksalmon",
        Darkseagreen => "darkseagreen",
        Darkslateblue => "darkslateblue",
        Darkslategray => "darkslategray",
        Darkslategrey => "darkslategrey",
        Darkturquoise => "darkturquoise",
        Darkviolet => "darkviolet",
        Deeppink => "deeppink",
        Deepskyblue => "deepskyblue",
        Dimgray => "dimgray",
        Dimgrey => "dimgrey",
        Dodgerblue => "dodgerblue",
        Firebrick => "firebrick",
        Floralwhite => "floralwhite",
        Forestgreen => "forestgreen",
        Fuchsia => "fuchsia",
        Gainsboro => "gainsboro",
        Ghostwhite => "ghostwhite",
        Gold => "gold",
        Goldenrod => "goldenrod",
        Gray => "gray",
        Grey => "grey",
        Green => "green",
        Greenyellow => "greenyellow",
        Honeydew => "honeydew",
        Hotpink => "hotpink",
        Indianred => "indianred",
        Indigo => "indigo",
        Ivory => "ivory",
        Khaki => "khaki",
        Lavender => "lavender",
        Lavenderblush => "lavenderblush",
        Lawngreen => "lawngreen",
        Lemonchiffon => "lemonchiffon",
        Lightblue => "lightblue",
        Lightcoral => "lightcoral",
        Lightcyan => "lightcyan",
        Lightgoldenrodyellow => "lightgoldenrodyellow",
        Lightgray => "lightgray",
        Lightgreen => "lightgreen",
        Lightgrey => "lightgrey",
        Lightpink => "lightpink",
        Lightsalmon => "lightsalmon",
        Lightseagreen => "lightseagreen",
        Lightskyblue => "lightskyblue",
        Lightslategray => "lightslategray",
        Lightslategrey => "lightslategrey",
        Lightsteelblue => "lightsteelblue",
        Lightyellow => "lightyellow",
        Lime => "lime",
        Limegreen => "limegreen",
        Linen => "linen",
        Magenta => "magenta",
        Maroon => "maroon",
        Mediumaquamarine => "mediumaquamarine",
        Mediumblue => "mediumblue",
        Mediumorchid => "mediumorchid",
        Mediumpurple => "mediumpurple",
        Mediumseagreen => "mediumseagreen",
        Mediumslateblue => "mediumslateblue",
        Mediumspringgreen => "mediumspringgreen",
        Mediumturquoise => "mediumturquoise",
        Mediumvioletred => "mediumvioletred",
        Midnightblue => "midnightblue",
        Mintcream => "mintcream",
        Mistyrose => "mistyrose",
        Moccasin => "moccasin",
        Navajowhite => "navajowhite",
        Navy => "navy",
        Oldlace => "oldlace",
        Olive => "olive",
        Olivedrab => "olivedrab",
        Orange => "orange",
        Orangered => "orangered",
        Orchid => "orchid",
        Palegoldenrod => "palegoldenrod",
        Palegreen => "palegreen",
        Paleturquoise => "paleturquoise",
        Palevioletred => "palevioletred",
        Papayawhip => "papayawhip",
        Peachpuff => "peachpuff",
        Peru => "peru",
        Pink => "pink",
        Plum => "plum",
        Powderblue => "powderblue",
        Purple => "purple",
        Red => "red",
        Rosybrown => "rosybrown",
        Royalblue => "royalblue",
        Saddlebrown => "saddlebrown",
        Salmon => "salmon",
        Sandybrown => "sandybrown",
        Seagreen => "seagreen",
        Seashell => "seashell",
        Sienna => "sienna",
        Silver => "silver",
        Skyblue => "skyblue",
        Slateblue => "slateblue",
        Slategray => "slategray",
        Slategrey => "slategrey",
        Snow => "snow",
        Springgreen => "springgreen",
        Steelblue => "steelblue",
        Tan => "tan",
        Teal => "teal",
        Thistle => "thistle",
        Tomato => "tomato",
        Turquoise => "turquoise",
        Violet => "violet",
        Wheat => "wheat",
        White => "white",
        Whitesmoke => "whitesmoke",
        Yellow => "yellow",
        Yellowgreen => "yellowgreen",
    }
}

palette! {
    /// Glyphs the renderer can draw in a cell.
    NamedSymbol {
        None => "none",
        A => "A",
        B => "B",
        C => "C",
        D => "D",
        E => "E",
        F => "F",
        G => "G",
        H => "H",
        I => "I",
        J => "J",
        K => "K",
        L => "L",
        M => "M",
        N => "N",
        O => "O",
        P => "P",
        Q => "Q",
        R => "R",
        S => "S",
        T => "T",
        U => "U",
        V => "V",
        W => "W",
        X => "X",
        Y => "Y",
        Z => "Z",
        SmallA => "a",
        SmallB => "b",
        SmallC => "c",
        SmallD => "d",
        SmallE => "e",
        SmallF => "f",
        SmallG => "g",
        SmallH => "h",
        SmallI => "i",
        SmallJ => "j",
        SmallK => "k",
        SmallL => "l",
        SmallM => "m",
        SmallN => "n",
        SmallO => "o",
        SmallP => "p",
        SmallQ => "q",
        SmallR => "r",
        SmallS => "s",
        SmallT => "t",
        SmallU => "u",
        SmallV => "v",
        SmallW => "w",
        SmallX => "x",
        SmallY => "y",
        SmallZ => "z",
        Zero => "zero",
        One => "one",
        Two => "two",
        Three => "three",
        Four => "four",
        Five => "five",
        Six => "six",
        Seven => "seven",
        Eight => "eight",
        Nine => "nine",
        Empty0 => "empty0",
        Circle => "circle",
        Square => "square",
        Diamond => "diamond",
        TriangleDown => "triangle_down",
        TriangleUp => "triangle_up",
        TriangleLeft => "triangle_left",
        TriangleRight => "triangle_right",
        Man => "man",
        Woman => "woman",
        Cat => "cat",
        Pawn => "pawn",
        Knight => "knight",
        Bishop => "bishop",
        Rook => "rook",
        Queen => "queen",
        King => "king",
        ArrowRight => "arrow_right",
        ArrowLeft => "arrow_left",
        ArrowUp => "arrow_up",
        ArrowDown => "arrow_down",
        Star => "star",
        Droplet => "droplet",
        Heart => "heart",
        Lightning => "lightning",
        Thoughtbubble => "thoughtbubble",
        Speechbubble => "speechbubble",
        Flower => "flower",
        SquareThatch => "square_thatch",
        CircleX => "circle_x",
        CircleX2 => "circle_x2",
        CircleSegment => "circle_segment",
        Empty1 => "empty1",
        Sword => "sword",
        HornHelmet => "horn_helmet",
        AstroHelmet => "astro_helmet",
        Target => "target",
        Empty2 => "empty2",
        Waves => "waves",
        Rain => "rain",
        Drink => "drink",
        Paperclip => "paperclip",
        Elephant => "elephant",
        Cowboyhat => "cowboyhat",
        Ballcap => "ballcap",
        Flag => "flag",
        Bomb => "bomb",
        Bear => "bear",
        Giraffe => "giraffe",
        Bug1 => "bug1",
        Bug2 => "bug2",
        Bug3 => "bug3",
        MagnifyingGlass => "magnifying_glass",
        Fishes => "fishes",
        Duck => "duck",
        Sloth => "sloth",
        Bird => "bird",
        Apple => "apple",
        Carrot => "carrot",
        Lemon => "lemon",
        Pepper => "pepper",
        Onion => "onion",
        Potion1 => "potion1",
        Potion2 => "potion2",
        BowAndArrow => "bow_and_arrow",
        Campfire => "campfire",
        Donut => "donut",
        Monitor => "monitor",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameCell {
    pub bg: NamedColor,
    pub fg: NamedColor,
    pub symbol: NamedSymbol,
}

impl Default for GameCell {
    fn default() -> Self {
        Self {
            bg: NamedColor::Black,
            fg: NamedColor::White,
            symbol: NamedSymbol::None,
        }
    }
}

/// Row-major grid of cells. Every mutation marks the board dirty until the
/// next render takes the flag.
#[derive(Debug, Clone)]
pub struct GameGrid {
    rows: usize,
    cols: usize,
    cells: Vec<GameCell>,
    dirty: bool,
}

impl GameGrid {
    pub fn new(rows: usize, cols: usize) -> Result<Self, ConfigError> {
        if rows == 0 || cols == 0 {
            return Err(ConfigError::EmptyBoard);
        }
        if rows.saturating_mul(cols) > MAX_BOARD_CELLS {
            return Err(ConfigError::BoardTooLarge {
                rows,
                cols,
                max_cells: MAX_BOARD_CELLS,
            });
        }

        Ok(Self {
            rows,
            cols,
            cells: vec![GameCell::default(); rows * cols],
            dirty: true,
        })
    }

    pub fn height(&self) -> usize {
        self.rows
    }

    pub fn width(&self) -> usize {
        self.cols
    }

    pub fn cells(&self) -> &[GameCell] {
        &self.cells
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&GameCell> {
        self.offset(row, col).ok().map(|offset| &self.cells[offset])
    }

    pub fn set_bg_color(
        &mut self,
        row: usize,
        col: usize,
        color: NamedColor,
    ) -> Result<(), BoardError> {
        self.cell_mut(row, col)?.bg = color;
        Ok(())
    }

    pub fn set_fg_color(
        &mut self,
        row: usize,
        col: usize,
        color: NamedColor,
    ) -> Result<(), BoardError> {
        self.cell_mut(row, col)?.fg = color;
        Ok(())
    }

    pub fn set_symbol(
        &mut self,
        row: usize,
        col: usize,
        symbol: NamedSymbol,
    ) -> Result<(), BoardError> {
        self.cell_mut(row, col)?.symbol = symbol;
        Ok(())
    }

    /// Draws a symbol in the given color on top of the cell background.
    pub fn draw_symbol(
        &mut self,
        row: usize,
        col: usize,
        symbol: NamedSymbol,
        color: NamedColor,
    ) -> Result<(), BoardError> {
        let cell = self.cell_mut(row, col)?;
        cell.symbol = symbol;
        cell.fg = color;
        Ok(())
    }

    pub fn bg_color(&self, row: usize, col: usize) -> Option<NamedColor> {
        self.cell(row, col).map(|cell| cell.bg)
    }

    pub fn symbol(&self, row: usize, col: usize) -> Option<NamedSymbol> {
        self.cell(row, col).map(|cell| cell.symbol)
    }

    pub fn symbol_color(&self, row: usize, col: usize) -> Option<NamedColor> {
        self.cell(row, col).map(|cell| cell.fg)
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Returns whether the board changed since the last call and clears the flag.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::replace(&mut self.dirty, false)
    }

    fn cell_mut(&mut self, row: usize, col: usize) -> Result<&mut GameCell, BoardError> {
        let offset = self.offset(row, col)?;
        self.dirty = true;
        Ok(&mut self.cells[offset])
    }

    fn offset(&self, row: usize, col: usize) -> Result<usize, BoardError> {
        if row >= self.rows || col >= self.cols {
            return Err(BoardError::OutOfBounds {
                row,
                col,
                rows: self.rows,
                cols: self.cols,
            });
        }
        Ok(row * self.cols + col)
    }
}
