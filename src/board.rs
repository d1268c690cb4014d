//! Grid state and the single-tick transition of the game.
//!
//! The snake is never stored as a list of segments. Every cell carries a
//! `fadeout` counter and the body is simply the set of `Snake` cells whose
//! counters have not yet run out; the tail retracts as those counters expire.

use std::mem;

use rand::rngs::StdRng;
use rand::seq::IteratorRandom;
use rand::{Rng, SeedableRng};
use thiserror::Error;
use tracing::{debug, trace};

use Direction::*;

/// Smallest side length a board may have.
pub const MIN_SIZE: usize = 3;

/// Random probes tried before falling back to scanning the free cells.
const FOOD_SAMPLE_ATTEMPTS: usize = 64;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PositionState {
    Free,
    Snake,
    Food,
    Wall,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    fn opposite(self) -> Direction {
        match self {
            Up => Down,
            Down => Up,
            Left => Right,
            Right => Left,
        }
    }

    fn delta(self) -> (isize, isize) {
        match self {
            Up => (0, -1),
            Down => (0, 1),
            Left => (-1, 0),
            Right => (1, 0),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Status {
    Running,
    /// The head ran into a wall or into the body.
    Crashed,
    /// The last food was eaten and there is no free cell left for another.
    Won,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BoardError {
    #[error("grid size {0} is too small, the minimum is {min}", min = MIN_SIZE)]
    GridTooSmall(usize),
    #[error("grid size {0} is too large to allocate")]
    GridTooLarge(usize),
    #[error("the snake needs a starting length of at least 1")]
    ZeroLength,
    #[error("no free cell is left to place food on")]
    NoFreeCell,
}

#[derive(Copy, Clone, Debug)]
struct Cell {
    state: PositionState,
    fadeout: usize,
}

impl Cell {
    const FREE: Cell = Cell { state: PositionState::Free, fadeout: 0 };

    fn set_head(&mut self, length: usize) {
        self.state = PositionState::Snake;
        self.fadeout = length - 1;
    }

    fn update(&mut self) {
        match self.state {
            PositionState::Food | PositionState::Wall => {}
            _ if self.fadeout == 0 => self.state = PositionState::Free,
            _ => self.fadeout -= 1,
        }
    }
}

pub struct Board<R = StdRng> {
    size: usize,
    cells: Vec<Cell>,
    length: usize,
    start_length: usize,
    head: (usize, usize),
    direction: Direction,
    direction_changed: bool,
    status: Status,
    rng: R,
}

impl Board<StdRng> {
    /// Creates a board whose food placement is seeded from OS entropy.
    pub fn new(size: usize, initial_length: usize, walls: bool) -> Result<Self, BoardError> {
        Board::with_rng(size, initial_length, walls, StdRng::from_entropy())
    }

    /// Creates a board with reproducible food placement.
    pub fn with_seed(size: usize, initial_length: usize, walls: bool, seed: u64) -> Result<Self, BoardError> {
        Board::with_rng(size, initial_length, walls, StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> Board<R> {
    /// Lays out a `size` x `size` grid, optionally walled in, with the head in
    /// the centre heading right and one piece of food.
    pub fn with_rng(size: usize, initial_length: usize, walls: bool, rng: R) -> Result<Self, BoardError> {
        if size < MIN_SIZE {
            return Err(BoardError::GridTooSmall(size));
        }
        if initial_length == 0 {
            return Err(BoardError::ZeroLength);
        }
        let cell_count = size
            .checked_mul(size)
            .filter(|&count| count <= isize::MAX as usize / mem::size_of::<Cell>())
            .ok_or(BoardError::GridTooLarge(size))?;

        let mut board = Board {
            size,
            cells: vec![Cell::FREE; cell_count],
            length: initial_length,
            start_length: initial_length,
            head: (size / 2, size / 2),
            direction: Right,
            direction_changed: false,
            status: Status::Running,
            rng,
        };

        if walls {
            let last = size - 1;
            for i in 0..size {
                for &(x, y) in &[(i, 0), (i, last), (0, i), (last, i)] {
                    let index = board.coordinate_index(x, y);
                    board.cells[index].state = PositionState::Wall;
                }
            }
        }

        let head = board.coordinate_index(board.head.0, board.head.1);
        board.cells[head].set_head(initial_length);
        board.place_food().ok_or(BoardError::NoFreeCell)?;

        Ok(board)
    }

    /// Advances the game by one tick. Returns `false` once the game is over,
    /// either because the head hit something or because the board is full.
    pub fn step(&mut self) -> bool {
        if self.status != Status::Running {
            return false;
        }

        let (dx, dy) = self.direction.delta();
        let next = self.wrap(self.head.0 as isize + dx, self.head.1 as isize + dy);
        let index = self.coordinate_index(next.0, next.1);

        let ate = match self.cells[index].state {
            PositionState::Snake | PositionState::Wall => {
                self.status = Status::Crashed;
                debug!(x = next.0, y = next.1, score = self.score(), "snake crashed");
                return false;
            }
            PositionState::Food => {
                self.length += 1;
                true
            }
            PositionState::Free => false,
        };

        // Ageing every cell is what makes the tail follow the head.
        for cell in self.cells.iter_mut() {
            cell.update();
        }

        self.cells[index].set_head(self.length);
        self.head = next;
        self.direction_changed = false;

        if ate {
            debug!(score = self.score(), length = self.length, "food eaten");
            if self.place_food().is_none() {
                self.status = Status::Won;
                debug!(score = self.score(), "board filled, game won");
                return false;
            }
        }

        true
    }

    /// Puts food on a uniformly chosen free cell and returns its index, or
    /// `None` when every cell is taken.
    fn place_food(&mut self) -> Option<usize> {
        let total = self.cells.len();

        for _ in 0..FOOD_SAMPLE_ATTEMPTS {
            let index = self.rng.gen_range(0..total);
            if self.cells[index].state == PositionState::Free {
                self.cells[index].state = PositionState::Food;
                return Some(index);
            }
        }

        let index = self
            .cells
            .iter()
            .enumerate()
            .filter(|(_, cell)| cell.state == PositionState::Free)
            .map(|(index, _)| index)
            .choose(&mut self.rng)?;
        self.cells[index].state = PositionState::Food;
        Some(index)
    }
}

impl<R> Board<R> {
    /// Changes heading for the next tick. Only the first accepted change in a
    /// tick counts and a full reversal is never accepted.
    pub fn set_direction(&mut self, new_direction: Direction) -> bool {
        if self.status != Status::Running || self.direction_changed {
            trace!(?new_direction, status = ?self.status, "direction change ignored");
            return false;
        }
        if new_direction == self.direction.opposite() {
            trace!(?new_direction, current = ?self.direction, "reversal ignored");
            return false;
        }

        self.direction = new_direction;
        self.direction_changed = true;
        true
    }

    /// State of the cell at `index = y * size + x`. Panics when `index` is
    /// outside the grid.
    pub fn position_state(&self, index: usize) -> PositionState {
        self.cells[index].state
    }

    /// Index of `(x, y)`, wrapping coordinates that fall off an edge.
    pub fn index_of(&self, x: isize, y: isize) -> usize {
        let (x, y) = self.wrap(x, y);
        self.coordinate_index(x, y)
    }

    pub fn score(&self) -> usize {
        self.length - self.start_length
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    pub fn length(&self) -> usize {
        self.length
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn head(&self) -> (usize, usize) {
        self.head
    }

    pub fn status(&self) -> Status {
        self.status
    }

    fn wrap(&self, x: isize, y: isize) -> (usize, usize) {
        let size = self.size as isize;
        (x.rem_euclid(size) as usize, y.rem_euclid(size) as usize)
    }

    fn coordinate_index(&self, x: usize, y: usize) -> usize {
        y * self.size + x
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count(board: &Board, state: PositionState) -> usize {
        (0..board.cell_count()).filter(|&i| board.position_state(i) == state).count()
    }

    fn states(board: &Board) -> Vec<PositionState> {
        (0..board.cell_count()).map(|i| board.position_state(i)).collect()
    }

    fn food_index(board: &Board) -> usize {
        (0..board.cell_count())
            .find(|&i| board.position_state(i) == PositionState::Food)
            .expect("board has no food")
    }

    /// Moves the food so scripted paths are not disturbed by random placement.
    fn move_food(board: &mut Board, x: usize, y: usize) {
        let old = food_index(board);
        board.cells[old].state = PositionState::Free;
        let new = board.coordinate_index(x, y);
        assert_eq!(board.cells[new].state, PositionState::Free);
        board.cells[new].state = PositionState::Food;
    }

    fn walled_board() -> Board {
        let mut board = Board::with_seed(10, 3, true, 7).unwrap();
        move_food(&mut board, 2, 2);
        board
    }

    #[test]
    fn test_rejects_bad_dimensions() {
        assert_eq!(Board::with_seed(2, 3, false, 0).err(), Some(BoardError::GridTooSmall(2)));
        assert_eq!(Board::with_seed(10, 0, false, 0).err(), Some(BoardError::ZeroLength));
        assert_eq!(Board::with_seed(1 << 33, 3, false, 0).err(), Some(BoardError::GridTooLarge(1 << 33)));
        assert_eq!(Board::with_seed(usize::MAX, 3, true, 0).err(), Some(BoardError::GridTooLarge(usize::MAX)));
        // A walled 3x3 grid only has the centre cell, which the head takes.
        assert_eq!(Board::with_seed(3, 1, true, 0).err(), Some(BoardError::NoFreeCell));
    }

    #[test]
    fn test_initial_layout() {
        let board = Board::with_seed(10, 3, true, 1).unwrap();

        assert_eq!(board.head(), (5, 5));
        assert_eq!(board.direction(), Right);
        assert_eq!(board.score(), 0);
        assert_eq!(board.cell_count(), 100);
        assert_eq!(board.status(), Status::Running);
        assert_eq!(board.position_state(board.index_of(5, 5)), PositionState::Snake);
        assert_eq!(board.cells[board.index_of(5, 5)].fadeout, 2);
        assert_eq!(count(&board, PositionState::Snake), 1);
        assert_eq!(count(&board, PositionState::Food), 1);
        assert_eq!(count(&board, PositionState::Wall), 36);

        for i in 0..10 {
            for &(x, y) in &[(i, 0), (i, 9), (0, i), (9, i)] {
                assert_eq!(board.position_state(board.index_of(x, y)), PositionState::Wall);
            }
        }
    }

    #[test]
    fn test_unwalled_board_has_no_walls() {
        let board = Board::with_seed(10, 3, false, 1).unwrap();
        assert_eq!(count(&board, PositionState::Wall), 0);
    }

    #[test]
    fn test_same_seed_places_same_food() {
        let a = Board::with_seed(20, 3, true, 99).unwrap();
        let b = Board::with_seed(20, 3, true, 99).unwrap();
        assert_eq!(food_index(&a), food_index(&b));
    }

    #[test]
    fn test_index_wraps() {
        let board = Board::with_seed(10, 3, false, 0).unwrap();
        assert_eq!(board.index_of(3, 4), 43);
        assert_eq!(board.index_of(10, 4), board.index_of(0, 4));
        assert_eq!(board.index_of(-1, 4), board.index_of(9, 4));
        assert_eq!(board.index_of(3, -1), board.index_of(3, 9));
        assert_eq!(board.index_of(3, 10), board.index_of(3, 0));
    }

    #[test]
    fn test_one_direction_change_per_tick() {
        let mut board = walled_board();

        assert!(board.set_direction(Up));
        assert!(!board.set_direction(Left));
        assert_eq!(board.direction(), Up);

        assert!(board.step());
        assert_eq!(board.head(), (5, 4));
        assert!(board.set_direction(Left));
        assert_eq!(board.direction(), Left);
    }

    #[test]
    fn test_reversal_is_ignored() {
        let mut board = walled_board();

        assert!(!board.set_direction(Left));
        assert_eq!(board.direction(), Right);

        // A rejected reversal does not use up the tick's change.
        assert!(board.set_direction(Down));
        assert!(board.step());
        assert!(!board.set_direction(Up));
        assert_eq!(board.direction(), Down);
    }

    #[test]
    fn test_double_turn_cannot_reverse_within_a_tick() {
        let mut board = walled_board();

        // Up then Left would put the head back onto its own neck.
        assert!(board.set_direction(Up));
        assert!(!board.set_direction(Left));
        assert!(board.step());
        assert_eq!(board.head(), (5, 4));
    }

    #[test]
    fn test_step_into_free_cell() {
        let mut board = walled_board();

        assert!(board.step());
        assert_eq!(board.head(), (6, 5));
        assert_eq!(board.position_state(board.index_of(6, 5)), PositionState::Snake);
        assert_eq!(board.cells[board.index_of(6, 5)].fadeout, 2);
        assert_eq!(board.cells[board.index_of(5, 5)].fadeout, 1);
    }

    #[test]
    fn test_tail_vacates_after_length_ticks() {
        let mut board = walled_board();
        let start = board.index_of(5, 5);

        assert!(board.step());
        assert!(board.step());
        assert_eq!(board.position_state(start), PositionState::Snake);
        assert_eq!(count(&board, PositionState::Snake), 3);

        assert!(board.step());
        assert_eq!(board.position_state(start), PositionState::Free);
        assert_eq!(board.position_state(board.index_of(6, 5)), PositionState::Snake);
        assert_eq!(count(&board, PositionState::Snake), 3);
    }

    #[test]
    fn test_wall_collision_leaves_grid_untouched() {
        let mut board = walled_board();

        assert!(board.step());
        assert!(board.step());
        assert!(board.step());
        assert_eq!(board.head(), (8, 5));

        let before = states(&board);
        assert!(!board.step());
        assert_eq!(states(&board), before);
        assert_eq!(board.head(), (8, 5));
        assert_eq!(board.status(), Status::Crashed);
    }

    #[test]
    fn test_self_collision() {
        let mut board = Board::with_seed(10, 5, true, 3).unwrap();
        move_food(&mut board, 2, 2);

        assert!(board.step());
        board.set_direction(Down);
        assert!(board.step());
        board.set_direction(Left);
        assert!(board.step());
        board.set_direction(Up);

        let before = states(&board);
        assert!(!board.step());
        assert_eq!(states(&board), before);
        assert_eq!(board.status(), Status::Crashed);
    }

    #[test]
    fn test_terminated_board_stays_terminated() {
        let mut board = walled_board();
        for _ in 0..3 {
            assert!(board.step());
        }
        assert!(!board.step());

        let before = states(&board);
        assert!(!board.step());
        assert!(!board.set_direction(Up));
        assert_eq!(states(&board), before);
        assert_eq!(board.direction(), Right);
    }

    #[test]
    fn test_eating_food() {
        let mut board = walled_board();
        move_food(&mut board, 6, 5);
        let free_before: Vec<usize> = (0..board.cell_count())
            .filter(|&i| board.position_state(i) == PositionState::Free)
            .collect();

        assert!(board.step());
        assert_eq!(board.length(), 4);
        assert_eq!(board.score(), 1);
        assert_eq!(board.position_state(board.index_of(6, 5)), PositionState::Snake);
        assert_eq!(board.cells[board.index_of(6, 5)].fadeout, 3);
        assert_eq!(count(&board, PositionState::Food), 1);

        let food = food_index(&board);
        assert_ne!(food, board.index_of(6, 5));
        assert!(free_before.contains(&food));
    }

    #[test]
    fn test_growth_delays_tail() {
        let mut board = walled_board();
        move_food(&mut board, 6, 5);

        assert!(board.step());
        move_food(&mut board, 2, 2);
        assert!(board.step());
        assert!(board.step());

        // The old cells keep their counters; the longer body shows up as the
        // newer cells outlive them.
        assert_eq!(board.head(), (8, 5));
        assert_eq!(board.position_state(board.index_of(5, 5)), PositionState::Free);
        assert_eq!(count(&board, PositionState::Snake), 3);

        board.set_direction(Down);
        assert!(board.step());
        assert_eq!(count(&board, PositionState::Snake), 4);
    }

    #[test]
    fn test_wraps_around_without_walls() {
        let mut board = Board::with_seed(10, 3, false, 5).unwrap();
        move_food(&mut board, 2, 2);

        for _ in 0..4 {
            assert!(board.step());
        }
        assert_eq!(board.head(), (9, 5));

        assert!(board.step());
        assert_eq!(board.head(), (0, 5));
        assert_eq!(board.position_state(board.index_of(0, 5)), PositionState::Snake);
    }

    #[test]
    fn test_wraps_through_top_edge() {
        let mut board = Board::with_seed(10, 3, false, 5).unwrap();
        move_food(&mut board, 2, 2);

        board.set_direction(Up);
        for _ in 0..5 {
            assert!(board.step());
        }
        assert_eq!(board.head(), (5, 0));

        assert!(board.step());
        assert_eq!(board.head(), (5, 9));
    }

    #[test]
    fn test_wrap_into_own_tail_crashes() {
        let mut board = Board::with_seed(5, 5, false, 5).unwrap();
        move_food(&mut board, 0, 0);

        for _ in 0..4 {
            assert!(board.step());
        }
        assert_eq!(board.head(), (1, 2));

        assert!(!board.step());
        assert_eq!(board.status(), Status::Crashed);
    }

    #[test]
    fn test_full_board_is_won() {
        let mut board = Board::with_seed(3, 1, false, 11).unwrap();
        for cell in board.cells.iter_mut() {
            *cell = Cell { state: PositionState::Snake, fadeout: 10 };
        }
        let next = board.index_of(2, 1);
        board.cells[next].state = PositionState::Food;

        assert!(!board.step());
        assert_eq!(board.status(), Status::Won);
        assert_eq!(board.head(), (2, 1));
        assert_eq!(board.score(), 1);
        assert_eq!(count(&board, PositionState::Food), 0);
        assert!(!board.step());
    }

    #[test]
    fn test_last_free_cell_gets_the_food() {
        let mut board = Board::with_seed(3, 1, false, 11).unwrap();
        for cell in board.cells.iter_mut() {
            *cell = Cell { state: PositionState::Snake, fadeout: 10 };
        }
        let next = board.index_of(2, 1);
        let spare = board.index_of(0, 0);
        board.cells[next].state = PositionState::Food;
        board.cells[spare] = Cell::FREE;

        assert!(board.step());
        assert_eq!(board.position_state(spare), PositionState::Food);
    }

    #[test]
    fn test_invariants_over_a_long_run() {
        let turns = [Up, Left, Down, Right];
        for &walls in &[true, false] {
            let mut board = Board::with_seed(12, 4, walls, 2024).unwrap();
            let mut last_score = 0;

            for tick in 0..400 {
                if tick % 5 == 0 {
                    board.set_direction(turns[(tick / 5) % turns.len()]);
                }
                let alive = board.step();

                assert!(board.score() >= last_score);
                assert_eq!(board.length() - 4, board.score());
                last_score = board.score();

                if walls {
                    assert_eq!(count(&board, PositionState::Wall), 44);
                }
                if !alive {
                    break;
                }
                assert_eq!(count(&board, PositionState::Food), 1);
            }
        }
    }
}
