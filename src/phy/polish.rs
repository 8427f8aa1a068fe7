//! Postfix (polish) encoding of slicing floorplans and the adjacency graph derived from it.

use std::{fmt, str::FromStr};

use itertools::Itertools;
use thiserror::Error;

use crate::ndarr::Arr2;

/// How two sub-floorplans are joined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cut {
	/// Side by side.
	H,
	/// Stacked.
	V,
}

impl Cut {
	pub fn complement(self) -> Self {
		match self {
			Cut::H => Cut::V,
			Cut::V => Cut::H,
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Token {
	/// Cell index within the module.
	Operand(usize),
	Operator(Cut),
}

impl Token {
	pub fn is_operator(&self) -> bool {
		matches!(self, Token::Operator(_))
	}
}

impl fmt::Display for Token {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Token::Operand(g) => write!(f, "{g}"),
			Token::Operator(Cut::H) => write!(f, "H"),
			Token::Operator(Cut::V) => write!(f, "V"),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PolishExpression {
	tokens: Vec<Token>,
}

impl PolishExpression {
	pub fn new(tokens: Vec<Token>) -> Self {
		Self { tokens }
	}

	/// `0 1 V 2 V ... n-1 V`: every cell stacked in index order.
	pub fn vertical_chain(n: usize) -> Self {
		let mut tokens = Vec::with_capacity((2 * n).saturating_sub(1));
		for g in 0..n {
			tokens.push(Token::Operand(g));
			if g > 0 {
				tokens.push(Token::Operator(Cut::V));
			}
		}
		Self { tokens }
	}

	pub fn tokens(&self) -> &[Token] {
		&self.tokens
	}

	pub(crate) fn tokens_mut(&mut self) -> &mut [Token] {
		&mut self.tokens
	}

	pub fn len(&self) -> usize {
		self.tokens.len()
	}

	pub fn is_empty(&self) -> bool {
		self.tokens.is_empty()
	}

	pub fn num_operands(&self) -> usize {
		self.tokens.iter().filter(|t| !t.is_operator()).count()
	}

	/// Entry `i` is the number of operators at or before position `i`.
	pub fn operator_counts(&self) -> Vec<usize> {
		self.tokens
			.iter()
			.scan(0, |count, t| {
				*count += t.is_operator() as usize;
				Some(*count)
			})
			.collect_vec()
	}

	/// Full slicing-expression check: the operand stack never underflows, ends with a single
	/// element, and the operands are exactly `0..n`.
	pub fn is_valid(&self) -> bool {
		if self.tokens.is_empty() {
			return true;
		}
		let n = self.num_operands();
		let mut seen = vec![false; n];
		let mut depth = 0usize;
		for t in &self.tokens {
			match *t {
				Token::Operand(g) => {
					if g >= n || seen[g] {
						return false;
					}
					seen[g] = true;
					depth += 1;
				},
				Token::Operator(_) => {
					if depth < 2 {
						return false;
					}
					depth -= 1;
				},
			}
		}
		depth == 1
	}
}

impl fmt::Display for PolishExpression {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.tokens.iter().join(" "))
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("bad polish token \"{0}\"")]
pub struct ParsePolishError(pub String);

impl FromStr for PolishExpression {
	type Err = ParsePolishError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		s.split_whitespace()
			.map(|t| match t {
				"H" => Ok(Token::Operator(Cut::H)),
				"V" => Ok(Token::Operator(Cut::V)),
				_ => t
					.parse::<usize>()
					.map(Token::Operand)
					.map_err(|_| ParsePolishError(t.to_owned())),
			})
			.collect::<Result<Vec<_>, _>>()
			.map(Self::new)
	}
}

/// Relation stored at `(i, j)` of an adjacency graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Adjacency {
	#[default]
	None,
	H,
	V,
}

impl From<Cut> for Adjacency {
	fn from(cut: Cut) -> Self {
		match cut {
			Cut::H => Adjacency::H,
			Cut::V => Adjacency::V,
		}
	}
}

pub type AdjacencyGraph = Arr2<Adjacency>;

/// Why an expression does not describe a slicing floorplan.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidExpression {
	#[error("operator at position {position} has fewer than two operands to join")]
	StackUnderflow { position: usize },
	#[error("expression leaves {groups} unjoined groups")]
	Unbalanced { groups: usize },
	#[error("operand {operand} at position {position} is not a cell index below {num_cells}")]
	OperandOutOfRange {
		operand: usize,
		position: usize,
		num_cells: usize,
	},
	#[error("operand {operand} appears twice (position {position})")]
	DuplicateOperand { operand: usize, position: usize },
}

/// `src -> dst` is rejected when some `k` already related to `src` relates to `dst` the same way.
fn validate_addition(graph: &AdjacencyGraph, src: usize, dst: usize) -> bool {
	let n = graph.dims().0;
	(0..n).all(|k| {
		let rel = graph[(src, k)];
		rel == Adjacency::None || rel != graph[(k, dst)]
	})
}

/// Folds the expression bottom-up: `leaf` turns an operand into a value, `join` combines the two
/// topmost values (lhs, then rhs) under an operator. An empty expression yields `None`.
pub(crate) fn evaluate<T, L, J>(
	expr: &PolishExpression,
	num_cells: usize,
	mut leaf: L,
	mut join: J,
) -> Result<Option<T>, InvalidExpression>
where
	L: FnMut(usize) -> T,
	J: FnMut(Cut, T, T) -> T,
{
	let mut seen = vec![false; num_cells];
	let mut stack: Vec<T> = Vec::with_capacity(num_cells);
	for (position, token) in expr.tokens().iter().enumerate() {
		match *token {
			Token::Operand(operand) => {
				if operand >= num_cells {
					return Err(InvalidExpression::OperandOutOfRange {
						operand,
						position,
						num_cells,
					});
				}
				if seen[operand] {
					return Err(InvalidExpression::DuplicateOperand { operand, position });
				}
				seen[operand] = true;
				stack.push(leaf(operand));
			},
			Token::Operator(cut) => {
				let (Some(rhs), Some(lhs)) = (stack.pop(), stack.pop()) else {
					return Err(InvalidExpression::StackUnderflow { position });
				};
				stack.push(join(cut, lhs, rhs));
			},
		}
	}
	if stack.len() > 1 {
		return Err(InvalidExpression::Unbalanced {
			groups: stack.len(),
		});
	}
	Ok(stack.pop())
}

/// Evaluates the expression over a stack of cell groups. Joining `lhs rhs H` marks `(g, h)` as
/// `H` and `lhs rhs V` marks `(h, g)` as `V`, for every `g` in lhs and `h` in rhs that passes
/// [`validate_addition`].
pub fn adjacency_graph(
	expr: &PolishExpression,
	num_cells: usize,
) -> Result<AdjacencyGraph, InvalidExpression> {
	let mut graph = Arr2::new([num_cells, num_cells]);
	evaluate(
		expr,
		num_cells,
		|g| vec![g],
		|cut, mut lhs, rhs| {
			for &g in &lhs {
				for &h in &rhs {
					let (src, dst) = match cut {
						Cut::H => (g, h),
						Cut::V => (h, g),
					};
					if validate_addition(&graph, src, dst) {
						graph[(src, dst)] = cut.into();
					}
				}
			}
			lhs.extend(rhs);
			lhs
		},
	)?;
	Ok(graph)
}

#[cfg(test)]
mod test {
	use super::*;

	fn parse(s: &str) -> PolishExpression {
		s.parse().unwrap()
	}

	fn relations(graph: &AdjacencyGraph) -> Vec<(usize, usize, Adjacency)> {
		let n = graph.dims().0;
		(0..n)
			.cartesian_product(0..n)
			.filter(|&(i, j)| graph[(i, j)] != Adjacency::None)
			.map(|(i, j)| (i, j, graph[(i, j)]))
			.collect_vec()
	}

	#[test]
	fn vertical_chain_shape() {
		let e = PolishExpression::vertical_chain(4);
		assert_eq!(e.to_string(), "0 1 V 2 V 3 V");
		assert_eq!(e.num_operands(), 4);
		assert_eq!(e.len() - e.num_operands(), 3);
		assert_eq!(e.operator_counts(), vec![0, 0, 1, 1, 2, 2, 3]);
		assert!(e.is_valid());
		assert_eq!(PolishExpression::vertical_chain(1).to_string(), "0");
		assert!(PolishExpression::vertical_chain(0).is_empty());
	}

	#[test]
	fn parse_round_trip_and_errors() {
		assert_eq!(parse("2 1 H 4 3 H V").to_string(), "2 1 H 4 3 H V");
		assert_eq!(
			"0 1 X".parse::<PolishExpression>(),
			Err(ParsePolishError("X".to_owned()))
		);
	}

	#[test]
	fn validity() {
		assert!(parse("0 1 H 2 V").is_valid());
		assert!(parse("0 1 2 H V").is_valid());
		assert!(!parse("0 H 1").is_valid());
		assert!(!parse("0 1 2 H").is_valid());
		assert!(!parse("0 0 H").is_valid());
		assert!(!parse("0 5 H").is_valid());
	}

	#[test]
	fn two_cells_stacked() {
		let g = adjacency_graph(&parse("0 1 V"), 2).unwrap();
		assert_eq!(relations(&g), vec![(1, 0, Adjacency::V)]);
	}

	#[test]
	fn two_cells_side_by_side() {
		let g = adjacency_graph(&parse("0 1 H"), 2).unwrap();
		assert_eq!(relations(&g), vec![(0, 1, Adjacency::H)]);
	}

	#[test]
	fn at_most_one_direction_per_pair() {
		let g = adjacency_graph(&parse("2 1 H 4 3 H V 0 H"), 5).unwrap();
		for i in 0..5 {
			assert_eq!(g[(i, i)], Adjacency::None);
			for j in 0..5 {
				assert!(g[(i, j)] == Adjacency::None || g[(j, i)] == Adjacency::None);
			}
		}
	}

	#[test]
	fn transitive_chain_check_follows_evaluation_order() {
		// Additions are checked in evaluation order: 0 H 2 goes in before 1 H 2 exists.
		let g = adjacency_graph(&parse("0 1 H 2 H"), 3).unwrap();
		assert_eq!(g[(0, 1)], Adjacency::H);
		assert_eq!(g[(1, 2)], Adjacency::H);
		assert_eq!(g[(0, 2)], Adjacency::H);
		let g = adjacency_graph(&parse("0 1 2 H H"), 3).unwrap();
		assert_eq!(g[(1, 2)], Adjacency::H);
		assert_eq!(g[(0, 1)], Adjacency::H);
		assert_eq!(g[(0, 2)], Adjacency::None);
	}

	#[test]
	fn underflow_is_reported_not_panicked() {
		assert_eq!(
			adjacency_graph(&parse("0 V 1"), 2),
			Err(InvalidExpression::StackUnderflow { position: 1 })
		);
		assert_eq!(
			adjacency_graph(&parse("0 1 V H"), 2),
			Err(InvalidExpression::StackUnderflow { position: 3 })
		);
	}

	#[test]
	fn unbalanced_and_out_of_range() {
		assert_eq!(
			adjacency_graph(&parse("0 1 2 V"), 3),
			Err(InvalidExpression::Unbalanced { groups: 2 })
		);
		assert!(matches!(
			adjacency_graph(&parse("0 7 V"), 2),
			Err(InvalidExpression::OperandOutOfRange { operand: 7, .. })
		));
		assert!(matches!(
			adjacency_graph(&parse("1 1 V"), 2),
			Err(InvalidExpression::DuplicateOperand { operand: 1, .. })
		));
	}
}
