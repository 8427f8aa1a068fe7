use std::ops::{Index, IndexMut};

/// Dense row-major 2D array. Used for the connectivity matrix and the floorplan adjacency graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Arr2<T> {
	data: Vec<T>,
	dims: [usize; 2],
}

impl<T> Index<usize> for Arr2<T> {
	type Output = [T];

	fn index(&self, index: usize) -> &Self::Output {
		&self.data[index * self.dims[1]..(index + 1) * self.dims[1]]
	}
}

impl<T> IndexMut<usize> for Arr2<T> {
	fn index_mut(&mut self, index: usize) -> &mut Self::Output {
		&mut self.data[index * self.dims[1]..(index + 1) * self.dims[1]]
	}
}

impl<T> Index<(usize, usize)> for Arr2<T> {
	type Output = T;

	fn index(&self, (i, j): (usize, usize)) -> &Self::Output {
		&self.data[i * self.dims[1] + j]
	}
}

impl<T> IndexMut<(usize, usize)> for Arr2<T> {
	fn index_mut(&mut self, (i, j): (usize, usize)) -> &mut Self::Output {
		&mut self.data[i * self.dims[1] + j]
	}
}

impl<T> Arr2<T>
where
	T: Default + Clone,
{
	pub fn new(dims: [usize; 2]) -> Self {
		let total_size: usize = dims.iter().product();
		Self {
			data: vec![T::default(); total_size],
			dims,
		}
	}

	/// Builds a square matrix from a closure over `(row, col)`.
	pub fn square_from_fn<F>(n: usize, mut func: F) -> Self
	where
		F: FnMut(usize, usize) -> T,
	{
		let mut ret = Self::new([n, n]);
		for i in 0..n {
			for j in 0..n {
				ret[(i, j)] = func(i, j);
			}
		}
		ret
	}

	pub fn fill(&mut self, value: T) {
		self.data.iter_mut().for_each(|x| *x = value.clone());
	}
}

impl<T> Arr2<T> {
	pub fn dims(&self) -> (usize, usize) {
		(self.dims[0], self.dims[1])
	}

	pub fn is_square(&self) -> bool {
		self.dims[0] == self.dims[1]
	}

	pub fn rows(&self) -> impl Iterator<Item = &[T]> {
		// chunks_exact panics on zero, an empty matrix has no rows anyway.
		self.data.chunks_exact(self.dims[1].max(1))
	}

	/// Relabels vertices `a` and `b` of a square matrix: swaps both their rows and their columns.
	pub fn swap_vertices(&mut self, a: usize, b: usize) {
		debug_assert!(self.is_square());
		if a == b {
			return;
		}
		let n = self.dims[1];
		for k in 0..n {
			self.data.swap(a * n + k, b * n + k);
		}
		for k in 0..self.dims[0] {
			self.data.swap(k * n + a, k * n + b);
		}
	}
}
