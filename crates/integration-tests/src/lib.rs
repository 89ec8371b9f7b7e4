//! Integration test support for the Orbit People workspace.
//!
//! [`InMemoryCrm`] implements [`PeopleApi`] over a vector of people. Tests
//! can make specific operations fail, hold them until released, or fail
//! them for specific ids, to drive the optimistic flows through every
//! outcome.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p orbit-integration-tests
//! ```

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, PoisonError};

use chrono::Utc;
use orbit_core::PersonId;
use orbit_front::crm::{
    CrmError, FieldPatch, PeopleApi, PeopleListParams, Person, PersonDraft, PersonSortKey,
    SortDirection,
};
use tokio::sync::watch;

/// Operations of the API, for failure and hold switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Get,
    List,
    Create,
    Update,
    Delete,
}

const ALL_OPS: [Op; 5] = [Op::Get, Op::List, Op::Create, Op::Update, Op::Delete];

/// In-memory CRM backend.
pub struct InMemoryCrm {
    people: Mutex<Vec<Person>>,
    failing: Mutex<HashSet<Op>>,
    failing_ids: Mutex<HashSet<PersonId>>,
    foreign_ids: Mutex<bool>,
    calls: Mutex<HashMap<Op, usize>>,
    gates: HashMap<Op, watch::Sender<bool>>,
}

impl Default for InMemoryCrm {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl InMemoryCrm {
    /// Backend seeded with `people`.
    #[must_use]
    pub fn new(people: Vec<Person>) -> Self {
        Self {
            people: Mutex::new(people),
            failing: Mutex::new(HashSet::new()),
            failing_ids: Mutex::new(HashSet::new()),
            foreign_ids: Mutex::new(false),
            calls: Mutex::new(HashMap::new()),
            gates: ALL_OPS
                .into_iter()
                .map(|op| (op, watch::channel(false).0))
                .collect(),
        }
    }

    /// Make every call of `op` fail with a transport error.
    pub fn fail(&self, op: Op) {
        lock(&self.failing).insert(op);
    }

    /// Stop failing `op`.
    pub fn succeed(&self, op: Op) {
        lock(&self.failing).remove(&op);
    }

    /// Fail any create or update that targets `id`.
    pub fn fail_id(&self, id: &PersonId) {
        lock(&self.failing_ids).insert(id.clone());
    }

    /// Answer creations with a server-chosen id instead of echoing the draft's.
    pub fn echo_foreign_ids(&self) {
        *lock(&self.foreign_ids) = true;
    }

    /// Hold calls of `op` until [`Self::release`].
    pub fn hold(&self, op: Op) {
        if let Some(gate) = self.gates.get(&op) {
            gate.send_replace(true);
        }
    }

    /// Let held calls of `op` proceed.
    pub fn release(&self, op: Op) {
        if let Some(gate) = self.gates.get(&op) {
            gate.send_replace(false);
        }
    }

    /// Number of calls made to `op`, including failed ones.
    #[must_use]
    pub fn calls(&self, op: Op) -> usize {
        lock(&self.calls).get(&op).copied().unwrap_or(0)
    }

    /// Server-side copy of a person.
    #[must_use]
    pub fn server_person(&self, id: &PersonId) -> Option<Person> {
        lock(&self.people).iter().find(|p| &p.id == id).cloned()
    }

    /// Number of people stored server-side.
    #[must_use]
    pub fn server_len(&self) -> usize {
        lock(&self.people).len()
    }

    async fn enter(&self, op: Op, id: Option<&PersonId>) -> Result<(), CrmError> {
        *lock(&self.calls).entry(op).or_insert(0) += 1;
        if let Some(gate) = self.gates.get(&op) {
            let mut rx = gate.subscribe();
            // The sender lives as long as `self`, so this cannot fail.
            let _ = rx.wait_for(|held| !*held).await;
        }
        let fails_op = lock(&self.failing).contains(&op);
        let fails_id = id.is_some_and(|id| lock(&self.failing_ids).contains(id));
        if fails_op || fails_id {
            return Err(CrmError::Transport(format!("{op:?} rejected by test backend")));
        }
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn display_name(person: &Person) -> String {
    format!("{} {}", person.first_name, person.last_name)
        .trim()
        .to_string()
}

fn sort_value(person: &Person, key: PersonSortKey) -> String {
    match key {
        PersonSortKey::FirstName => person.first_name.clone(),
        PersonSortKey::LastName => person.last_name.clone(),
        PersonSortKey::Email => person.email.clone().unwrap_or_default(),
        PersonSortKey::City => person.city.clone().unwrap_or_default(),
        PersonSortKey::CreatedAt => person
            .created_at
            .map(|t| t.to_rfc3339())
            .unwrap_or_default(),
    }
}

impl PeopleApi for InMemoryCrm {
    async fn get_person(&self, id: &PersonId) -> Result<Person, CrmError> {
        self.enter(Op::Get, Some(id)).await?;
        self.server_person(id)
            .ok_or_else(|| CrmError::NotFound(id.to_string()))
    }

    async fn list_people(&self, params: PeopleListParams) -> Result<Vec<Person>, CrmError> {
        self.enter(Op::List, None).await?;
        let mut people = lock(&self.people).clone();
        if let Some((key, direction)) = params.sort {
            people.sort_by_key(|p| sort_value(p, key));
            if direction == SortDirection::Desc {
                people.reverse();
            }
        }
        let skip = params.skip.and_then(|s| usize::try_from(s).ok()).unwrap_or(0);
        let take = params
            .take
            .and_then(|t| usize::try_from(t).ok())
            .unwrap_or(usize::MAX);
        Ok(people.into_iter().skip(skip).take(take).collect())
    }

    async fn create_person(&self, draft: PersonDraft) -> Result<Person, CrmError> {
        self.enter(Op::Create, Some(&draft.id)).await?;
        let id = if *lock(&self.foreign_ids) {
            PersonId::generate()
        } else {
            draft.id
        };
        let mut person = Person::placeholder(id);
        person.first_name = draft.first_name;
        person.last_name = draft.last_name;
        person.display_name = display_name(&person);
        person.created_at = Some(Utc::now());
        lock(&self.people).push(person.clone());
        Ok(person)
    }

    async fn update_person_field(
        &self,
        id: &PersonId,
        patch: FieldPatch,
    ) -> Result<Person, CrmError> {
        self.enter(Op::Update, Some(id)).await?;
        let mut people = lock(&self.people);
        let person = people
            .iter_mut()
            .find(|p| &p.id == id)
            .ok_or_else(|| CrmError::NotFound(id.to_string()))?;
        if !person.set(patch.field, patch.value) {
            return Err(CrmError::graphql(format!(
                "invalid value for {}",
                patch.field
            )));
        }
        person.display_name = display_name(person);
        Ok(person.clone())
    }

    async fn delete_people(&self, ids: Vec<PersonId>) -> Result<u64, CrmError> {
        self.enter(Op::Delete, None).await?;
        let mut people = lock(&self.people);
        let before = people.len();
        people.retain(|p| !ids.contains(&p.id));
        Ok(u64::try_from(before - people.len()).unwrap_or(u64::MAX))
    }
}

/// A confirmed person with a name and city, as the server would return it.
#[must_use]
pub fn person(id: &str, first: &str, last: &str, city: Option<&str>) -> Person {
    let mut p = Person::placeholder(PersonId::new(id));
    p.first_name = first.to_string();
    p.last_name = last.to_string();
    p.display_name = display_name(&p);
    p.city = city.map(String::from);
    p.created_at = Some(Utc::now());
    p
}

/// Three people: Ada, Grace and Linus.
#[must_use]
pub fn seed() -> Vec<Person> {
    vec![
        person("ada", "Ada", "Lovelace", Some("London")),
        person("grace", "Grace", "Hopper", Some("New York")),
        person("linus", "Linus", "Torvalds", None),
    ]
}
