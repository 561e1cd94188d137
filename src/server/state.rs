use crate::address::AddressResolver;

pub struct AppState {
    pub resolver: AddressResolver,
}
