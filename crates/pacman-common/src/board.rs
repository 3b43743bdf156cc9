//! The per-session shared game state (C4).
//!
//! A [`Board`] owns the grid, the single pacman, and the ghost roster for one
//! session. Callers are expected to wrap it in a `parking_lot::RwLock` (see
//! `pacman_server::session`) — this type itself has no synchronization.

/// One grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cell {
    /// `true` once a wall has been placed here; walls never carry a dot or portal.
    pub wall: bool,
    pub has_portal: bool,
    pub has_dot: bool,
}

/// The server's single pacman.
#[derive(Debug, Clone)]
pub struct Pacman {
    pub alive: bool,
    pub pos_x: i32,
    pub pos_y: i32,
    pub points: i32,
    pub passo: i32,
}

impl Default for Pacman {
    fn default() -> Self {
        Self {
            alive: true,
            pos_x: 0,
            pos_y: 0,
            points: 0,
            passo: 0,
        }
    }
}

/// One entry in a ghost's periodic move program.
#[derive(Debug, Clone, Copy)]
pub struct GhostMove {
    pub command: char,
    /// For `T` entries, how many ticks this entry waits; 1 for every other command.
    pub turns: i32,
}

#[derive(Debug, Clone)]
pub struct Ghost {
    pub pos_x: i32,
    pub pos_y: i32,
    pub moves: Vec<GhostMove>,
    pub current_move: usize,
    pub passo: i32,
    pub charged: bool,
    /// Remaining ticks of a `T n` entry in progress; 0 when not waiting.
    pub turns_left: i32,
    /// Per-ghost xorshift state, seeded at load time so `R` moves are
    /// reproducible across runs for a fixed level and ghost index.
    pub(crate) rng_state: u64,
}

impl Ghost {
    pub fn effective_move(&self) -> Option<GhostMove> {
        if self.moves.is_empty() {
            return None;
        }
        Some(self.moves[self.current_move % self.moves.len()])
    }
}

#[derive(Debug, Clone)]
pub struct Board {
    pub width: i32,
    pub height: i32,
    pub tempo: i32,
    pub cells: Vec<Cell>,
    pub pacman: Pacman,
    pub ghosts: Vec<Ghost>,
}

impl Board {
    /// An empty placeholder board (no level loaded yet).
    pub fn empty() -> Self {
        Self {
            width: 0,
            height: 0,
            tempo: 0,
            cells: Vec::new(),
            pacman: Pacman::default(),
            ghosts: Vec::new(),
        }
    }

    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && x < self.width && y < self.height
    }

    pub fn idx(&self, x: i32, y: i32) -> usize {
        (y * self.width + x) as usize
    }

    pub fn cell(&self, x: i32, y: i32) -> &Cell {
        &self.cells[self.idx(x, y)]
    }

    pub fn cell_mut(&mut self, x: i32, y: i32) -> &mut Cell {
        let i = self.idx(x, y);
        &mut self.cells[i]
    }

    /// Index of the ghost occupying `(x, y)`, if any.
    pub fn ghost_at(&self, x: i32, y: i32) -> Option<usize> {
        self.ghosts
            .iter()
            .position(|g| g.pos_x == x && g.pos_y == y)
    }

    /// Render the grid into the BOARD-frame cell encoding (§4.2): `#` wall,
    /// `C` pacman, `M`/`G` ghost, `.` dot, `@` portal, ` ` empty.
    pub fn render_cells(&self) -> Vec<u8> {
        let mut out = vec![b' '; (self.width * self.height) as usize];
        for y in 0..self.height {
            for x in 0..self.width {
                let i = self.idx(x, y);
                let cell = self.cells[i];
                out[i] = if cell.wall {
                    b'#'
                } else if cell.has_portal {
                    b'@'
                } else if cell.has_dot {
                    b'.'
                } else {
                    b' '
                };
            }
        }
        if self.pacman.alive && self.in_bounds(self.pacman.pos_x, self.pacman.pos_y) {
            let i = self.idx(self.pacman.pos_x, self.pacman.pos_y);
            out[i] = b'C';
        }
        for ghost in &self.ghosts {
            if self.in_bounds(ghost.pos_x, ghost.pos_y) {
                let i = self.idx(ghost.pos_x, ghost.pos_y);
                out[i] = if ghost.charged { b'G' } else { b'M' };
            }
        }
        out
    }
}
