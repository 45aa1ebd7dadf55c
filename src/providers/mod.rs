pub mod openexchangerates;
