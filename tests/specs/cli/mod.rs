mod help;
mod list;
mod marks;
