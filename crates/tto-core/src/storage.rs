//! Persistence boundary: row lookups plus an all-or-nothing conditional commit.

use std::{
    collections::BTreeMap,
    fmt,
    sync::{PoisonError, RwLock},
};

use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use tto_domain::{Balance, Identifiable, Income, Payee, PaymentInstruction, Project, Versioned};

use crate::error::{CoreError, CoreResult};

/// Abstraction over persistence backends holding the office book.
///
/// Reads return detached copies. Every mutation goes through [`commit`], which
/// checks the version each write was computed against and applies the whole
/// batch or nothing.
///
/// [`commit`]: OfficeStorage::commit
pub trait OfficeStorage: Send + Sync {
    fn project(&self, id: Uuid) -> CoreResult<Option<Project>>;
    fn projects(&self) -> CoreResult<Vec<Project>>;
    fn income(&self, id: Uuid) -> CoreResult<Option<Income>>;
    fn incomes_for_project(&self, project_id: Uuid) -> CoreResult<Vec<Income>>;
    fn balance(&self, payee: &Payee) -> CoreResult<Option<Balance>>;
    fn balances(&self) -> CoreResult<Vec<Balance>>;
    fn instruction(&self, id: Uuid) -> CoreResult<Option<PaymentInstruction>>;
    fn instructions_for_payee(&self, payee: &Payee) -> CoreResult<Vec<PaymentInstruction>>;
    fn commit(&self, batch: WriteBatch) -> CoreResult<()>;
}

/// Identifies a single row in the book.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowKey {
    Project(Uuid),
    Income(Uuid),
    Balance(Payee),
    Instruction(Uuid),
}

impl fmt::Display for RowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowKey::Project(id) => write!(f, "project {id}"),
            RowKey::Income(id) => write!(f, "income {id}"),
            RowKey::Balance(payee) => write!(f, "balance {payee}"),
            RowKey::Instruction(id) => write!(f, "payment instruction {id}"),
        }
    }
}

#[derive(Debug, Clone)]
enum Row {
    Project(Project),
    Income(Income),
    Balance(Balance),
    Instruction(PaymentInstruction),
}

#[derive(Debug, Clone)]
enum Write {
    /// `expected` is `None` for inserts; the row must not exist yet.
    Put { row: Row, expected: Option<u64> },
    Delete { key: RowKey, expected: u64 },
}

/// A set of conditional writes committed as one unit.
///
/// Updates carry the version of the row they were computed from; inserts
/// require the row to be absent.
#[derive(Debug, Clone, Default)]
pub struct WriteBatch {
    writes: Vec<Write>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn insert_project(&mut self, project: Project) -> &mut Self {
        self.put(Row::Project(project), None)
    }

    pub fn update_project(&mut self, project: Project) -> &mut Self {
        let expected = Some(project.version());
        self.put(Row::Project(project), expected)
    }

    pub fn insert_income(&mut self, income: Income) -> &mut Self {
        self.put(Row::Income(income), None)
    }

    pub fn update_income(&mut self, income: Income) -> &mut Self {
        let expected = Some(income.version());
        self.put(Row::Income(income), expected)
    }

    pub fn insert_balance(&mut self, balance: Balance) -> &mut Self {
        self.put(Row::Balance(balance), None)
    }

    pub fn update_balance(&mut self, balance: Balance) -> &mut Self {
        let expected = Some(balance.version());
        self.put(Row::Balance(balance), expected)
    }

    /// Inserts a fresh balance (version 0) or updates a loaded one.
    pub fn upsert_balance(&mut self, balance: Balance, is_new: bool) -> &mut Self {
        if is_new {
            self.insert_balance(balance)
        } else {
            self.update_balance(balance)
        }
    }

    pub fn insert_instruction(&mut self, instruction: PaymentInstruction) -> &mut Self {
        self.put(Row::Instruction(instruction), None)
    }

    pub fn update_instruction(&mut self, instruction: PaymentInstruction) -> &mut Self {
        let expected = Some(instruction.version());
        self.put(Row::Instruction(instruction), expected)
    }

    pub fn delete_instruction(&mut self, instruction: &PaymentInstruction) -> &mut Self {
        self.writes.push(Write::Delete {
            key: RowKey::Instruction(instruction.id),
            expected: instruction.version(),
        });
        self
    }

    fn put(&mut self, row: Row, expected: Option<u64>) -> &mut Self {
        self.writes.push(Write::Put { row, expected });
        self
    }
}

/// In-memory tables for every entity, shared by the storage backends.
#[derive(Debug, Clone, Default)]
pub struct Book {
    projects: BTreeMap<Uuid, Project>,
    incomes: BTreeMap<Uuid, Income>,
    balances: BTreeMap<Payee, Balance>,
    instructions: BTreeMap<Uuid, PaymentInstruction>,
}

/// Serializable form of a [`Book`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BookSnapshot {
    #[serde(default)]
    pub projects: Vec<Project>,
    #[serde(default)]
    pub incomes: Vec<Income>,
    #[serde(default)]
    pub balances: Vec<Balance>,
    #[serde(default)]
    pub instructions: Vec<PaymentInstruction>,
}

impl Book {
    pub fn from_snapshot(snapshot: BookSnapshot) -> Self {
        Self {
            projects: snapshot.projects.into_iter().map(|p| (p.id(), p)).collect(),
            incomes: snapshot.incomes.into_iter().map(|i| (i.id(), i)).collect(),
            balances: snapshot
                .balances
                .into_iter()
                .map(|b| (b.payee, b))
                .collect(),
            instructions: snapshot
                .instructions
                .into_iter()
                .map(|p| (p.id(), p))
                .collect(),
        }
    }

    pub fn to_snapshot(&self) -> BookSnapshot {
        BookSnapshot {
            projects: self.projects.values().cloned().collect(),
            incomes: self.incomes.values().cloned().collect(),
            balances: self.balances.values().cloned().collect(),
            instructions: self.instructions.values().cloned().collect(),
        }
    }

    pub fn project(&self, id: Uuid) -> Option<&Project> {
        self.projects.get(&id)
    }

    pub fn projects(&self) -> impl Iterator<Item = &Project> {
        self.projects.values()
    }

    pub fn income(&self, id: Uuid) -> Option<&Income> {
        self.incomes.get(&id)
    }

    pub fn incomes_for_project(&self, project_id: Uuid) -> impl Iterator<Item = &Income> {
        self.incomes
            .values()
            .filter(move |income| income.project_id == project_id)
    }

    pub fn balance(&self, payee: &Payee) -> Option<&Balance> {
        self.balances.get(payee)
    }

    pub fn balances(&self) -> impl Iterator<Item = &Balance> {
        self.balances.values()
    }

    pub fn instruction(&self, id: Uuid) -> Option<&PaymentInstruction> {
        self.instructions.get(&id)
    }

    pub fn instructions_for_payee<'a>(
        &'a self,
        payee: &'a Payee,
    ) -> impl Iterator<Item = &'a PaymentInstruction> {
        self.instructions
            .values()
            .filter(move |instruction| &instruction.payee == payee)
    }

    fn current_version(&self, key: &RowKey) -> Option<u64> {
        match key {
            RowKey::Project(id) => self.projects.get(id).map(|row| row.version),
            RowKey::Income(id) => self.incomes.get(id).map(|row| row.version),
            RowKey::Balance(payee) => self.balances.get(payee).map(|row| row.version),
            RowKey::Instruction(id) => self.instructions.get(id).map(|row| row.version),
        }
    }

    /// Checks every expectation in `batch`, then applies all of its writes.
    /// Nothing is modified when any expectation is stale.
    pub fn apply(&mut self, batch: WriteBatch) -> CoreResult<()> {
        for write in &batch.writes {
            let (key, expected) = match write {
                Write::Put { row, expected } => (row_key(row), *expected),
                Write::Delete { key, expected } => (*key, Some(*expected)),
            };
            let current = self.current_version(&key);
            if current != expected {
                debug!(%key, ?expected, ?current, "stale write rejected");
                return Err(CoreError::ConcurrencyConflict(key.to_string()));
            }
        }
        for write in batch.writes {
            match write {
                Write::Put { row, expected } => {
                    let version = expected.map_or(1, |v| v + 1);
                    self.store(row, version);
                }
                Write::Delete { key, .. } => self.remove(&key),
            }
        }
        Ok(())
    }

    fn store(&mut self, row: Row, version: u64) {
        match row {
            Row::Project(mut project) => {
                project.version = version;
                self.projects.insert(project.id, project);
            }
            Row::Income(mut income) => {
                income.version = version;
                self.incomes.insert(income.id, income);
            }
            Row::Balance(mut balance) => {
                balance.version = version;
                self.balances.insert(balance.payee, balance);
            }
            Row::Instruction(mut instruction) => {
                instruction.version = version;
                self.instructions.insert(instruction.id, instruction);
            }
        }
    }

    fn remove(&mut self, key: &RowKey) {
        match key {
            RowKey::Project(id) => {
                self.projects.remove(id);
            }
            RowKey::Income(id) => {
                self.incomes.remove(id);
            }
            RowKey::Balance(payee) => {
                self.balances.remove(payee);
            }
            RowKey::Instruction(id) => {
                self.instructions.remove(id);
            }
        }
    }
}

fn row_key(row: &Row) -> RowKey {
    match row {
        Row::Project(project) => RowKey::Project(project.id),
        Row::Income(income) => RowKey::Income(income.id),
        Row::Balance(balance) => RowKey::Balance(balance.payee),
        Row::Instruction(instruction) => RowKey::Instruction(instruction.id),
    }
}

/// Volatile backend for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    book: RwLock<Book>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(snapshot: BookSnapshot) -> Self {
        Self {
            book: RwLock::new(Book::from_snapshot(snapshot)),
        }
    }

    pub fn snapshot(&self) -> CoreResult<BookSnapshot> {
        self.read(|book| book.to_snapshot())
    }

    fn read<T>(&self, f: impl FnOnce(&Book) -> T) -> CoreResult<T> {
        let guard = self.book.read().map_err(poisoned)?;
        Ok(f(&guard))
    }
}

fn poisoned<T>(_: PoisonError<T>) -> CoreError {
    CoreError::Storage("book lock poisoned".into())
}

impl OfficeStorage for MemoryStorage {
    fn project(&self, id: Uuid) -> CoreResult<Option<Project>> {
        self.read(|book| book.project(id).cloned())
    }

    fn projects(&self) -> CoreResult<Vec<Project>> {
        self.read(|book| book.projects().cloned().collect())
    }

    fn income(&self, id: Uuid) -> CoreResult<Option<Income>> {
        self.read(|book| book.income(id).cloned())
    }

    fn incomes_for_project(&self, project_id: Uuid) -> CoreResult<Vec<Income>> {
        self.read(|book| book.incomes_for_project(project_id).cloned().collect())
    }

    fn balance(&self, payee: &Payee) -> CoreResult<Option<Balance>> {
        self.read(|book| book.balance(payee).cloned())
    }

    fn balances(&self) -> CoreResult<Vec<Balance>> {
        self.read(|book| book.balances().cloned().collect())
    }

    fn instruction(&self, id: Uuid) -> CoreResult<Option<PaymentInstruction>> {
        self.read(|book| book.instruction(id).cloned())
    }

    fn instructions_for_payee(&self, payee: &Payee) -> CoreResult<Vec<PaymentInstruction>> {
        self.read(|book| book.instructions_for_payee(payee).cloned().collect())
    }

    fn commit(&self, batch: WriteBatch) -> CoreResult<()> {
        let mut guard = self.book.write().map_err(poisoned)?;
        guard.apply(batch)
    }
}
