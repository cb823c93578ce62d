mod audit;
mod common;
mod criteria;
mod payment;
mod routing;
