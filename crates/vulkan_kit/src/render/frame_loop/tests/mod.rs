//! Frame loop tests against a scripted backend

mod mock;
