use super::partition::partition;
use crate::netlist::Module;
use crate::padframe::AreaBudget;
use crate::Result;

/// Row-packing estimate of a module's footprint: cells are laid left to right by width, wrapping
/// to a new row when the row would exceed `slice_width`. Each row is as tall as its tallest cell.
///
/// Packing runs cell `width` along the slice and stacks rows by cell `length`. This is the
/// transpose of [`slicing_layout`](super::slicing_layout), which draws `length` along x.
pub fn estimate_dims(module: &Module, slice_width: f64) -> (f64, f64) {
	let mut max_width: f64 = 0.0;
	let mut height = 0.0;
	let (mut row_width, mut row_height): (f64, f64) = (0.0, 0.0);
	for cell in module.cells() {
		if row_width > 0.0 && row_width + cell.width > slice_width {
			max_width = max_width.max(row_width);
			height += row_height;
			row_width = 0.0;
			row_height = 0.0;
		}
		row_width += cell.width;
		row_height = row_height.max(cell.length);
	}
	max_width = max_width.max(row_width);
	height += row_height;
	(max_width, height)
}

pub fn fits(module: &Module, budget: AreaBudget) -> bool {
	let (w, h) = estimate_dims(module, budget.slice_width);
	w <= budget.slice_width && h <= budget.slice_height
}

/// Bisects `module` until every piece fits `budget`. Sibling branches run as a rayon fork/join on
/// the global pool. The result is ordered depth-first, first half before second half.
pub fn partition_to_fit(module: Module, budget: AreaBudget) -> Result<Vec<Module>> {
	if fits(&module, budget) {
		log::debug!(
			"\"{}\" fits with {} cells",
			module.name,
			module.num_cells()
		);
		return Ok(vec![module]);
	}
	if module.num_cells() < 2 {
		let (w, h) = estimate_dims(&module, budget.slice_width);
		log::warn!(
			"\"{}\" cannot be split further and exceeds the slice: {w}x{h} > {}x{}",
			module.name,
			budget.slice_width,
			budget.slice_height
		);
		return Ok(vec![module]);
	}
	let (first, second) = partition(&module)?;
	drop(module);
	let (first, second) = rayon::join(
		|| partition_to_fit(first, budget),
		|| partition_to_fit(second, budget),
	);
	let mut ret = first?;
	ret.extend(second?);
	Ok(ret)
}

#[cfg(test)]
mod test {
	use itertools::Itertools;

	use super::*;
	use crate::netlist::Gate;

	/// `n` cells in a chain, cell `i` drives net `w{i}`.
	fn chain(n: usize, (width, length): (f64, f64)) -> Module {
		let cells = (0..n)
			.map(|i| {
				let input = if i == 0 { "in".to_owned() } else { format!("w{}", i - 1) };
				Gate::new("buf", (width, length), vec![input], vec![format!("w{i}")])
			})
			.collect_vec();
		Module::new("chain", vec!["in".to_owned()], vec![format!("w{}", n - 1)], cells)
	}

	#[test]
	fn row_estimate_wraps() {
		let m = chain(5, (2.0, 3.0));
		assert_eq!(estimate_dims(&m, 100.0), (10.0, 3.0));
		assert_eq!(estimate_dims(&m, 4.0), (4.0, 9.0));
		assert_eq!(estimate_dims(&chain(0, (1.0, 1.0)), 4.0), (0.0, 0.0));
	}

	#[test]
	fn width_runs_along_the_slice() {
		let m = chain(1, (6.0, 1.0));
		assert_eq!(estimate_dims(&m, 6.0), (6.0, 1.0));
		assert!(fits(&m, AreaBudget::new(6.0, 1.0)));
		assert!(!fits(&m, AreaBudget::new(1.0, 6.0)));
	}

	#[test]
	fn base_case_returns_module() {
		let m = chain(4, (1.0, 1.0));
		let pieces = partition_to_fit(m.clone(), AreaBudget::new(10.0, 10.0)).unwrap();
		assert_eq!(pieces, vec![m]);
	}

	#[test]
	fn every_cell_lands_in_exactly_one_piece() {
		let m = chain(37, (2.0, 3.0));
		let budget = AreaBudget::new(8.0, 3.0);
		let pieces = partition_to_fit(m.clone(), budget).unwrap();
		assert!(pieces.len() >= 10);
		for p in &pieces {
			assert!(fits(p, budget));
		}
		let nets = pieces
			.iter()
			.flat_map(|p| p.cells().iter().map(|c| c.outputs[0].clone()))
			.sorted()
			.collect_vec();
		let expected = (0..37).map(|i| format!("w{i}")).sorted().collect_vec();
		assert_eq!(nets, expected);
	}

	#[test]
	fn deterministic_order() {
		let m = chain(20, (2.0, 3.0));
		let budget = AreaBudget::new(6.0, 3.0);
		let a = partition_to_fit(m.clone(), budget).unwrap();
		let b = partition_to_fit(m, budget).unwrap();
		assert_eq!(a, b);
	}

	#[test]
	fn oversize_single_cell_is_best_effort() {
		let m = chain(1, (50.0, 50.0));
		let pieces = partition_to_fit(m.clone(), AreaBudget::new(10.0, 10.0)).unwrap();
		assert_eq!(pieces, vec![m]);
	}
}
