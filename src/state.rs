use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

/// Type-keyed application state shared by every request.
///
/// Values are inserted while the application is being assembled; once the
/// first clone is handed to a request the map is frozen.
#[derive(Default, Debug, Clone)]
pub struct State {
    data: Arc<HashMap<TypeId, Box<dyn Any + Send + Sync>>>,
}

impl State {
    pub fn new() -> Self {
        Self {
            data: Arc::new(HashMap::new()),
        }
    }

    /// Returns `false` when the state is already shared and can no longer change.
    pub(crate) fn insert<T: 'static + Send + Sync>(&mut self, value: T) -> bool {
        match Arc::get_mut(&mut self.data) {
            Some(data) => {
                data.insert(TypeId::of::<T>(), Box::new(value));
                true
            }
            None => false,
        }
    }

    pub fn get<T: 'static>(&self) -> Option<&T> {
        self.data
            .get(&TypeId::of::<T>())
            .and_then(|boxed| boxed.downcast_ref())
    }
}
