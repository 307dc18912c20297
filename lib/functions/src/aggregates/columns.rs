use rdf_pipeline_model::{Bindings, Term, Variable};
use rustc_hash::FxHashMap;

/// The solutions of a group, stored column by column.
///
/// All columns have the same length. A row that does not bind a variable has [None] in the
/// variable's column.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GroupColumns {
    variables: Vec<Variable>,
    positions: FxHashMap<Variable, usize>,
    columns: Vec<Vec<Option<Term>>>,
    len: usize,
}

impl GroupColumns {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a row. Variables that have not been seen before get a new column.
    pub fn push(&mut self, row: &Bindings) {
        for (variable, _) in row.iter() {
            if !self.positions.contains_key(variable) {
                self.positions.insert(variable.clone(), self.variables.len());
                self.variables.push(variable.clone());
                self.columns.push(vec![None; self.len]);
            }
        }
        for (variable, column) in self.variables.iter().zip(self.columns.iter_mut()) {
            column.push(row.get(variable).cloned());
        }
        self.len += 1;
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    /// The values of `variable`, one per row.
    pub fn column(&self, variable: &Variable) -> Option<&[Option<Term>]> {
        let position = *self.positions.get(variable)?;
        self.columns.get(position).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The values of all columns in row `index`.
    pub fn values(&self, index: usize) -> impl Iterator<Item = Option<&Term>> {
        self.columns
            .iter()
            .map(move |column| column.get(index).and_then(Option::as_ref))
    }

    /// Reassembles row `index`.
    pub fn row(&self, index: usize) -> Bindings {
        self.variables
            .iter()
            .zip(self.values(index))
            .filter_map(|(variable, term)| Some((variable.clone(), term?.clone())))
            .collect()
    }
}

impl<'rows> FromIterator<&'rows Bindings> for GroupColumns {
    fn from_iter<T: IntoIterator<Item = &'rows Bindings>>(rows: T) -> Self {
        let mut columns = Self::new();
        for row in rows {
            columns.push(row);
        }
        columns
    }
}
