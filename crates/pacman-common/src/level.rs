//! Level catalogue and level-file grammar (C3, §4.3, §4.3a).

use std::fs;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use crate::board::{Board, Cell, Ghost, GhostMove, Pacman};

pub const MAX_GHOSTS: usize = 16;
pub const MAX_MOVES: usize = 256;

#[derive(Debug, thiserror::Error)]
pub enum LevelError {
    #[error("no level files found in {0}")]
    NoLevels(PathBuf),
    #[error("level index {index} out of range (have {count})")]
    IndexOutOfRange { index: usize, count: usize },
    #[error("missing DIM directive in level file {0}")]
    MissingDimensions(PathBuf),
    #[error("level grid in {0} is shorter than its declared height")]
    ShortGrid(PathBuf),
    #[error("could not read directory {0}: {1}")]
    Directory(PathBuf, std::io::Error),
    #[error("could not open level file {0}: {1}")]
    OpenFile(PathBuf, std::io::Error),
}

/// List `.lvl` files in `dir`, excluding dotfiles, sorted lexicographically
/// ascending on the basename (the ordering contract in §4.3).
fn sorted_level_names(dir: &Path) -> Result<Vec<String>, LevelError> {
    let entries =
        fs::read_dir(dir).map_err(|e| LevelError::Directory(dir.to_path_buf(), e))?;
    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| LevelError::Directory(dir.to_path_buf(), e))?;
        let name = entry.file_name();
        let name = name.to_string_lossy().into_owned();
        if name.starts_with('.') {
            continue;
        }
        if !name.ends_with(".lvl") {
            continue;
        }
        names.push(name);
    }
    names.sort();
    Ok(names)
}

/// C3 `count` — number of `.lvl` files in `dir`.
pub fn count(dir: &Path) -> Result<usize, LevelError> {
    Ok(sorted_level_names(dir)?.len())
}

/// C3 `load_nth` — load the `index`-th level (lexicographic order) into
/// `board`, seeding `points` with `carry_points`.
pub fn load_nth(
    board: &mut Board,
    dir: &Path,
    index: usize,
    carry_points: i32,
) -> Result<(), LevelError> {
    let names = sorted_level_names(dir)?;
    if names.is_empty() {
        return Err(LevelError::NoLevels(dir.to_path_buf()));
    }
    if index >= names.len() {
        return Err(LevelError::IndexOutOfRange {
            index,
            count: names.len(),
        });
    }
    let path = dir.join(&names[index]);
    *board = parse_level_file(&path, dir, carry_points)?;
    Ok(())
}

struct Directives {
    width: Option<i32>,
    height: Option<i32>,
    tempo: i32,
    pac_file: Option<PathBuf>,
    ghost_files: Vec<PathBuf>,
}

fn read_lines(path: &Path) -> Result<Vec<String>, LevelError> {
    let file =
        fs::File::open(path).map_err(|e| LevelError::OpenFile(path.to_path_buf(), e))?;
    let reader = BufReader::new(file);
    let mut lines = Vec::new();
    for line in reader.lines() {
        let line = line.map_err(|e| LevelError::OpenFile(path.to_path_buf(), e))?;
        lines.push(line.trim_end_matches('\r').to_string());
    }
    Ok(lines)
}

fn parse_level_file(path: &Path, dir: &Path, carry_points: i32) -> Result<Board, LevelError> {
    let lines = read_lines(path)?;
    let mut directives = Directives {
        width: None,
        height: None,
        tempo: 500,
        pac_file: None,
        ghost_files: Vec::new(),
    };

    let mut cursor = 0;
    while cursor < lines.len() {
        let line = &lines[cursor];
        if line.is_empty() || line.starts_with('#') {
            cursor += 1;
            continue;
        }
        let mut tokens = line.split_whitespace();
        let Some(word) = tokens.next() else {
            cursor += 1;
            continue;
        };
        match word {
            "DIM" => {
                let w = tokens.next().and_then(|s| s.parse::<i32>().ok());
                let h = tokens.next().and_then(|s| s.parse::<i32>().ok());
                directives.width = w;
                directives.height = h;
            }
            "TEMPO" => {
                if let Some(t) = tokens.next().and_then(|s| s.parse::<i32>().ok()) {
                    directives.tempo = t;
                }
            }
            "PAC" => {
                if let Some(name) = tokens.next() {
                    directives.pac_file = Some(dir.join(name));
                }
            }
            "MON" => {
                for name in tokens.take(MAX_GHOSTS - 1) {
                    directives.ghost_files.push(dir.join(name));
                }
            }
            _ => break,
        }
        cursor += 1;
    }

    let width = directives
        .width
        .ok_or_else(|| LevelError::MissingDimensions(path.to_path_buf()))?;
    let height = directives
        .height
        .ok_or_else(|| LevelError::MissingDimensions(path.to_path_buf()))?;

    let mut cells = vec![Cell::default(); (width * height) as usize];
    let mut grid_rows: Vec<&str> = Vec::with_capacity(height as usize);
    for line in lines[cursor..].iter() {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        grid_rows.push(line.as_str());
        if grid_rows.len() as i32 == height {
            break;
        }
    }
    if grid_rows.len() as i32 != height {
        return Err(LevelError::ShortGrid(path.to_path_buf()));
    }

    for (row, line) in grid_rows.iter().enumerate() {
        let chars: Vec<char> = line.chars().collect();
        for col in 0..width as usize {
            let idx = row * width as usize + col;
            let ch = chars.get(col).copied().unwrap_or(' ');
            cells[idx] = match ch {
                'X' => Cell {
                    wall: true,
                    has_portal: false,
                    has_dot: false,
                },
                '@' => Cell {
                    wall: false,
                    has_portal: true,
                    has_dot: false,
                },
                _ => Cell {
                    wall: false,
                    has_portal: false,
                    has_dot: true,
                },
            };
        }
    }

    let mut board = Board {
        width,
        height,
        tempo: directives.tempo,
        cells,
        pacman: Pacman::default(),
        ghosts: Vec::new(),
    };
    board.pacman.points = carry_points;

    load_pacman(&mut board, directives.pac_file.as_deref())?;
    for (i, ghost_path) in directives.ghost_files.iter().enumerate() {
        let ghost = load_ghost(&board, ghost_path, i as u64)?;
        board.ghosts.push(ghost);
    }

    Ok(board)
}

fn load_pacman(board: &mut Board, pac_file: Option<&Path>) -> Result<(), LevelError> {
    let Some(path) = pac_file else {
        for y in 0..board.height {
            for x in 0..board.width {
                let cell = board.cell(x, y);
                if !cell.wall && !cell.has_portal {
                    board.pacman.pos_x = x;
                    board.pacman.pos_y = y;
                    return Ok(());
                }
            }
        }
        return Ok(());
    };

    for line in read_lines(path)? {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut tokens = line.split_whitespace();
        match tokens.next() {
            Some("PASSO") => {
                if let Some(n) = tokens.next().and_then(|s| s.parse::<i32>().ok()) {
                    board.pacman.passo = n;
                }
            }
            Some("POS") => {
                let x = tokens.next().and_then(|s| s.parse::<i32>().ok());
                let y = tokens.next().and_then(|s| s.parse::<i32>().ok());
                if let (Some(x), Some(y)) = (x, y) {
                    board.pacman.pos_x = x;
                    board.pacman.pos_y = y;
                }
            }
            _ => break,
        }
    }
    Ok(())
}

fn load_ghost(board: &Board, path: &Path, seed_index: u64) -> Result<Ghost, LevelError> {
    let lines = read_lines(path)?;
    let mut ghost = Ghost {
        pos_x: 0,
        pos_y: 0,
        moves: Vec::new(),
        current_move: 0,
        passo: 0,
        charged: false,
        turns_left: 0,
        rng_state: 0x9E3779B97F4A7C15 ^ (seed_index.wrapping_add(1)),
    };

    let mut cursor = 0;
    while cursor < lines.len() {
        let line = &lines[cursor];
        if line.is_empty() || line.starts_with('#') {
            cursor += 1;
            continue;
        }
        let mut tokens = line.split_whitespace();
        match tokens.next() {
            Some("PASSO") => {
                if let Some(n) = tokens.next().and_then(|s| s.parse::<i32>().ok()) {
                    ghost.passo = n;
                }
                cursor += 1;
            }
            Some("POS") => {
                let x = tokens.next().and_then(|s| s.parse::<i32>().ok());
                let y = tokens.next().and_then(|s| s.parse::<i32>().ok());
                if let (Some(x), Some(y)) = (x, y) {
                    ghost.pos_x = x;
                    ghost.pos_y = y;
                }
                cursor += 1;
            }
            _ => break,
        }
    }

    let _ = board;
    for line in lines[cursor..].iter() {
        if ghost.moves.len() >= MAX_MOVES {
            break;
        }
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let first = line.chars().next().unwrap();
        if matches!(first, 'W' | 'A' | 'S' | 'D' | 'R' | 'C') {
            ghost.moves.push(GhostMove {
                command: first,
                turns: 1,
            });
        } else if first == 'T' {
            let rest = line[1..].trim();
            if let Ok(n) = rest.parse::<i32>() {
                if n > 0 {
                    ghost.moves.push(GhostMove {
                        command: 'T',
                        turns: n,
                    });
                }
            }
        }
    }

    Ok(ghost)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        let mut f = File::create(&path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn count_ignores_non_lvl_and_dotfiles() {
        let dir = tempdir().unwrap();
        write_file(dir.path(), "01.lvl", "DIM 3 1\nTEMPO 100\n...\n");
        write_file(dir.path(), "02.lvl", "DIM 3 1\nTEMPO 100\n...\n");
        write_file(dir.path(), "readme.txt", "not a level");
        write_file(dir.path(), ".hidden.lvl", "DIM 3 1\nTEMPO 100\n...\n");
        assert_eq!(count(dir.path()).unwrap(), 2);
    }

    #[test]
    fn load_nth_respects_lexicographic_order() {
        let dir = tempdir().unwrap();
        write_file(dir.path(), "02.lvl", "DIM 2 1\nTEMPO 200\n..\n");
        write_file(dir.path(), "01.lvl", "DIM 3 1\nTEMPO 100\nX.@\n");
        let mut board = Board::empty();
        load_nth(&mut board, dir.path(), 0, 0).unwrap();
        assert_eq!(board.width, 3);
        assert_eq!(board.tempo, 100);
        load_nth(&mut board, dir.path(), 1, 0).unwrap();
        assert_eq!(board.width, 2);
        assert_eq!(board.tempo, 200);
    }

    #[test]
    fn load_nth_out_of_range_is_an_error() {
        let dir = tempdir().unwrap();
        write_file(dir.path(), "01.lvl", "DIM 2 1\nTEMPO 100\n..\n");
        let mut board = Board::empty();
        let err = load_nth(&mut board, dir.path(), 5, 0).unwrap_err();
        assert!(matches!(err, LevelError::IndexOutOfRange { .. }));
    }

    #[test]
    fn missing_dimensions_is_an_error() {
        let dir = tempdir().unwrap();
        write_file(dir.path(), "01.lvl", "TEMPO 100\n..\n");
        let mut board = Board::empty();
        let err = load_nth(&mut board, dir.path(), 0, 0).unwrap_err();
        assert!(matches!(err, LevelError::MissingDimensions(_)));
    }

    #[test]
    fn grid_parses_walls_portals_and_dots() {
        let dir = tempdir().unwrap();
        write_file(dir.path(), "01.lvl", "DIM 3 1\nTEMPO 100\nX.@\n");
        let mut board = Board::empty();
        load_nth(&mut board, dir.path(), 0, 0).unwrap();
        assert!(board.cells[0].wall);
        assert!(board.cells[1].has_dot);
        assert!(board.cells[2].has_portal);
    }

    #[test]
    fn load_then_unload_then_reload_is_byte_identical() {
        let dir = tempdir().unwrap();
        write_file(dir.path(), "01.lvl", "DIM 3 2\nTEMPO 100\nX.@\n...\n");
        let mut board = Board::empty();
        load_nth(&mut board, dir.path(), 0, 0).unwrap();
        let first = board.render_cells();
        board = Board::empty();
        load_nth(&mut board, dir.path(), 0, 0).unwrap();
        let second = board.render_cells();
        assert_eq!(first, second);
    }

    #[test]
    fn pacman_defaults_to_first_empty_cell_without_pac_directive() {
        let dir = tempdir().unwrap();
        write_file(dir.path(), "01.lvl", "DIM 3 1\nTEMPO 100\nX.@\n");
        let mut board = Board::empty();
        load_nth(&mut board, dir.path(), 0, 7).unwrap();
        assert_eq!((board.pacman.pos_x, board.pacman.pos_y), (1, 0));
        assert_eq!(board.pacman.points, 7);
    }

    #[test]
    fn ghost_move_program_parses_letters_and_wait() {
        let dir = tempdir().unwrap();
        write_file(
            dir.path(),
            "ghost1.txt",
            "PASSO 1\nPOS 0 0\nW\nD\nT 3\n",
        );
        write_file(dir.path(), "01.lvl", "DIM 3 1\nTEMPO 100\nMON ghost1.txt\n.X@\n");
        let mut board = Board::empty();
        load_nth(&mut board, dir.path(), 0, 0).unwrap();
        assert_eq!(board.ghosts.len(), 1);
        let ghost = &board.ghosts[0];
        assert_eq!(ghost.passo, 1);
        assert_eq!(ghost.moves.len(), 3);
        assert_eq!(ghost.moves[2].command, 'T');
        assert_eq!(ghost.moves[2].turns, 3);
    }
}
