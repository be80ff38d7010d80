use keygit_refs::RefStore;
use keygit_store::ObjectStore;

/// The storage-provider contract protocol sessions run against: one
/// repository's objects and references.
pub trait Storer: ObjectStore + RefStore {}

impl<T: ObjectStore + RefStore> Storer for T {}
