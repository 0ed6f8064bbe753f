use crate::Mark;

/// The 8 winning lines: 3 rows, 3 columns, 2 diagonals.
pub const WINNING_LINES: [[usize; 3]; 8] = [
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    [0, 4, 8],
    [2, 4, 6],
];

/// First line holding three identical marks, with that mark.
pub fn find_winner(board: &[Option<Mark>; 9]) -> Option<(Mark, [usize; 3])> {
    WINNING_LINES.iter().find_map(|&[a, b, c]| match board[a] {
        Some(mark) if board[b] == Some(mark) && board[c] == Some(mark) => Some((mark, [a, b, c])),
        _ => None,
    })
}

pub fn is_full(board: &[Option<Mark>; 9]) -> bool {
    board.iter().all(Option::is_some)
}
