//! Plain-text board renderer (no curses TUI — out of scope per
//! `SPEC_FULL.md` §1).

use pacman_common::protocol::BoardFrame;

pub fn render(frame: &BoardFrame) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "tempo={} points={} game_over={} victory={}\n",
        frame.tempo, frame.points, frame.game_over != 0, frame.victory != 0
    ));
    for row in 0..frame.height {
        let start = (row * frame.width) as usize;
        let end = start + frame.width as usize;
        let line = &frame.cells[start..end];
        out.push_str(std::str::from_utf8(line).unwrap_or("?"));
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_header_and_grid_rows() {
        let frame = BoardFrame {
            width: 3,
            height: 2,
            tempo: 100,
            victory: 0,
            game_over: 0,
            points: 4,
            cells: b"#C@...".to_vec(),
        };
        let text = render(&frame);
        assert!(text.contains("tempo=100"));
        assert!(text.contains("points=4"));
        assert!(text.contains("#C@"));
        assert!(text.contains("..."));
    }
}
