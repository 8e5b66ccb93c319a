mod close;
mod credentials;
