mod checkout;
mod helpers;
mod mocks;
mod sellers;
mod webhooks;
