//! Recursive-descent parser.
//!
//! Grammar:
//!
//! ```text
//! Program    ::= Function+
//! Function   ::= "func" Ident "(" Params? ")" ":" Type Block
//! Params     ::= Param ("," Param)*
//! Param      ::= Ident ":" Type
//! Type       ::= "int" | "bool"
//! Block      ::= "{" Stmt* "}"
//! Stmt       ::= VarDecl | Assign | If | While | Return | Block | ExprStmt
//! VarDecl    ::= "var" Ident "=" Expr ";"
//! Assign     ::= Ident "=" Expr ";"
//! If         ::= "if" "(" Expr ")" Block ("else" Block)?
//! While      ::= "while" "(" Expr ")" Block
//! Return     ::= "return" Expr? ";"
//! ExprStmt   ::= Expr ";"
//! Expr       ::= LogicOr
//! LogicOr    ::= LogicAnd ("||" LogicAnd)*
//! LogicAnd   ::= Equality ("&&" Equality)*
//! Equality   ::= Comparison (("==" | "!=") Comparison)*
//! Comparison ::= Term (("<" | "<=" | ">" | ">=") Term)*
//! Term       ::= Factor (("+" | "-") Factor)*
//! Factor     ::= Unary (("*" | "/" | "%") Unary)*
//! Unary      ::= "!" Unary | Primary
//! Primary    ::= IntLit | "true" | "false" | Ident | Call | "(" Expr ")"
//! Call       ::= Ident "(" (Expr ("," Expr)*)? ")"
//! ```
//!
//! All binary operators are left-associative. Parsing stops at the first
//! grammar violation; no partial tree escapes.

use super::errors::ParseError;
use super::tokenizer::{Token, TokenKind, TokenStream};
use super::tree::{BinaryOp, Expr, ExprKind, Function, Param, Program, Stmt, UnaryOp};
use crate::sem::Type;

pub fn parse(stream: &TokenStream) -> Result<Program, ParseError> {
    let tokens = stream.tokens();
    if tokens.is_empty() {
        return Err(ParseError::EmptyProgram);
    }
    Parser { tokens, current: 0 }.parse_program()
}

struct Parser<'a> {
    tokens: &'a [Token],
    current: usize,
}

impl Parser<'_> {
    fn current(&self) -> &Token {
        // The stream always ends with Eof and the cursor never moves
        // past it.
        &self.tokens[self.current]
    }

    fn is_at_end(&self) -> bool {
        self.current().kind == TokenKind::Eof
    }

    fn check(&self, kind: &TokenKind) -> bool {
        self.current().kind == *kind
    }

    fn matches(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.current += 1;
            return true;
        }
        false
    }

    fn expect(&mut self, kind: &TokenKind, message: &str) -> Result<(), ParseError> {
        if self.matches(kind) {
            return Ok(());
        }
        Err(ParseError::expected(message, self.current()))
    }

    fn expect_identifier(&mut self, message: &str) -> Result<String, ParseError> {
        if let TokenKind::Identifier(name) = &self.current().kind {
            let name = name.clone();
            self.current += 1;
            return Ok(name);
        }
        Err(ParseError::expected(message, self.current()))
    }

    fn parse_program(&mut self) -> Result<Program, ParseError> {
        let mut functions = Vec::new();
        while !self.is_at_end() {
            functions.push(self.parse_function()?);
        }
        if functions.is_empty() {
            return Err(ParseError::EmptyProgram);
        }
        Ok(Program { functions })
    }

    fn parse_function(&mut self) -> Result<Function, ParseError> {
        self.expect(&TokenKind::Func, "Expected 'func'")?;
        let name = self.expect_identifier("Expected function name")?;
        self.expect(&TokenKind::LParen, "Expected '(' after function name")?;

        let mut params = Vec::new();
        if !self.check(&TokenKind::RParen) {
            loop {
                let param_name = self.expect_identifier("Expected parameter name")?;
                self.expect(&TokenKind::Colon, "Expected ':' after parameter name")?;
                let ty = self.parse_type()?;
                params.push(Param {
                    name: param_name,
                    ty,
                });
                if !self.matches(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(&TokenKind::RParen, "Expected ')' after parameters")?;

        self.expect(&TokenKind::Colon, "Expected ':' before return type")?;
        let return_type = self.parse_type()?;
        let body = self.parse_block()?;

        Ok(Function {
            name,
            params,
            return_type,
            body,
        })
    }

    fn parse_type(&mut self) -> Result<Type, ParseError> {
        if self.matches(&TokenKind::IntKw) {
            return Ok(Type::Int);
        }
        if self.matches(&TokenKind::BoolKw) {
            return Ok(Type::Bool);
        }
        Err(ParseError::expected("Expected type", self.current()))
    }

    fn parse_block(&mut self) -> Result<Stmt, ParseError> {
        self.expect(&TokenKind::LBrace, "Expected '{'")?;
        let mut statements = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.is_at_end() {
            statements.push(self.parse_statement()?);
        }
        self.expect(&TokenKind::RBrace, "Expected '}'")?;
        Ok(Stmt::Block(statements))
    }

    fn parse_statement(&mut self) -> Result<Stmt, ParseError> {
        if self.matches(&TokenKind::Var) {
            return self.parse_var_decl();
        }
        if self.matches(&TokenKind::If) {
            return self.parse_if();
        }
        if self.matches(&TokenKind::While) {
            return self.parse_while();
        }
        if self.matches(&TokenKind::Return) {
            return self.parse_return();
        }
        if self.check(&TokenKind::LBrace) {
            return self.parse_block();
        }

        // A statement starting with an identifier is an assignment only
        // when '=' follows; otherwise rewind and parse an expression.
        if let TokenKind::Identifier(name) = &self.current().kind {
            let name = name.clone();
            let checkpoint = self.current;
            self.current += 1;
            if self.matches(&TokenKind::Assign) {
                let value = self.parse_expression()?;
                self.expect(&TokenKind::Semicolon, "Expected ';' after assignment")?;
                return Ok(Stmt::Assign { name, value });
            }
            self.current = checkpoint;
        }

        let expr = self.parse_expression()?;
        self.expect(&TokenKind::Semicolon, "Expected ';' after expression")?;
        Ok(Stmt::Expr(expr))
    }

    fn parse_var_decl(&mut self) -> Result<Stmt, ParseError> {
        let name = self.expect_identifier("Expected variable name")?;
        self.expect(&TokenKind::Assign, "Expected '=' after variable name")?;
        let init = self.parse_expression()?;
        self.expect(
            &TokenKind::Semicolon,
            "Expected ';' after variable declaration",
        )?;
        // The declared type is provisional until the checker infers it
        // from the initializer.
        Ok(Stmt::VarDecl {
            name,
            ty: Type::Int,
            init,
        })
    }

    fn parse_if(&mut self) -> Result<Stmt, ParseError> {
        self.expect(&TokenKind::LParen, "Expected '(' after 'if'")?;
        let condition = self.parse_expression()?;
        self.expect(&TokenKind::RParen, "Expected ')' after condition")?;
        let then_block = Box::new(self.parse_block()?);
        let else_block = if self.matches(&TokenKind::Else) {
            Some(Box::new(self.parse_block()?))
        } else {
            None
        };
        Ok(Stmt::If {
            condition,
            then_block,
            else_block,
        })
    }

    fn parse_while(&mut self) -> Result<Stmt, ParseError> {
        self.expect(&TokenKind::LParen, "Expected '(' after 'while'")?;
        let condition = self.parse_expression()?;
        self.expect(&TokenKind::RParen, "Expected ')' after condition")?;
        let body = Box::new(self.parse_block()?);
        Ok(Stmt::While { condition, body })
    }

    fn parse_return(&mut self) -> Result<Stmt, ParseError> {
        let expr = if self.check(&TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect(&TokenKind::Semicolon, "Expected ';' after return")?;
        Ok(Stmt::Return(expr))
    }

    fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        self.parse_logical_or()
    }

    fn parse_logical_or(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_logical_and()?;
        while self.matches(&TokenKind::Or) {
            let right = self.parse_logical_and()?;
            left = binary(BinaryOp::Or, left, right);
        }
        Ok(left)
    }

    fn parse_logical_and(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_equality()?;
        while self.matches(&TokenKind::And) {
            let right = self.parse_equality()?;
            left = binary(BinaryOp::And, left, right);
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_comparison()?;
        loop {
            let op = match self.current().kind {
                TokenKind::Eq => BinaryOp::Eq,
                TokenKind::Ne => BinaryOp::Ne,
                _ => break,
            };
            self.current += 1;
            let right = self.parse_comparison()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_comparison(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_term()?;
        loop {
            let op = match self.current().kind {
                TokenKind::Lt => BinaryOp::Lt,
                TokenKind::Le => BinaryOp::Le,
                TokenKind::Gt => BinaryOp::Gt,
                TokenKind::Ge => BinaryOp::Ge,
                _ => break,
            };
            self.current += 1;
            let right = self.parse_term()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_term(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_factor()?;
        loop {
            let op = match self.current().kind {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.current += 1;
            let right = self.parse_factor()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_factor(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.current().kind {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                TokenKind::Percent => BinaryOp::Mod,
                _ => break,
            };
            self.current += 1;
            let right = self.parse_unary()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        if self.matches(&TokenKind::Not) {
            let operand = self.parse_unary()?;
            return Ok(Expr::new(ExprKind::Unary {
                op: UnaryOp::Not,
                operand: Box::new(operand),
            }));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        if let TokenKind::IntLiteral(value) = self.current().kind {
            self.current += 1;
            return Ok(Expr::new(ExprKind::IntLiteral(value)));
        }
        if self.matches(&TokenKind::True) {
            return Ok(Expr::new(ExprKind::BoolLiteral(true)));
        }
        if self.matches(&TokenKind::False) {
            return Ok(Expr::new(ExprKind::BoolLiteral(false)));
        }

        if let TokenKind::Identifier(name) = &self.current().kind {
            let name = name.clone();
            self.current += 1;
            if self.matches(&TokenKind::LParen) {
                let mut args = Vec::new();
                if !self.check(&TokenKind::RParen) {
                    loop {
                        args.push(self.parse_expression()?);
                        if !self.matches(&TokenKind::Comma) {
                            break;
                        }
                    }
                }
                self.expect(&TokenKind::RParen, "Expected ')' after arguments")?;
                return Ok(Expr::new(ExprKind::Call { callee: name, args }));
            }
            return Ok(Expr::new(ExprKind::Variable(name)));
        }

        // Grouping parentheses affect precedence only; no tree node.
        if self.matches(&TokenKind::LParen) {
            let expr = self.parse_expression()?;
            self.expect(&TokenKind::RParen, "Expected ')' after expression")?;
            return Ok(expr);
        }

        Err(ParseError::expected("Expected expression", self.current()))
    }
}

fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    Expr::new(ExprKind::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::tokenizer::Tokenizer;

    fn parse_source(source: &str) -> Result<Program, ParseError> {
        parse(&Tokenizer::tokenize(source))
    }

    fn parse_expr(source: &str) -> Expr {
        let program = parse_source(&format!("func main() : int {{ {}; }}", source)).unwrap();
        match &program.functions[0].body {
            Stmt::Block(statements) => match &statements[0] {
                Stmt::Expr(expr) => expr.clone(),
                other => panic!("expected expression statement, got {:?}", other),
            },
            other => panic!("expected block, got {:?}", other),
        }
    }

    #[test]
    fn parses_factorial_program() {
        let program = parse_source(
            "func factorial(n: int) : int { \
               var result = 1; \
               while (n > 1) { result = result * n; n = n - 1; } \
               return result; \
             } \
             func main() : int { print(factorial(5)); return 0; }",
        )
        .unwrap();

        assert_eq!(program.functions.len(), 2);
        let factorial = &program.functions[0];
        assert_eq!(factorial.name, "factorial");
        assert_eq!(factorial.params.len(), 1);
        assert_eq!(factorial.params[0].name, "n");
        assert_eq!(factorial.params[0].ty, Type::Int);
        assert_eq!(factorial.return_type, Type::Int);

        let body = match &factorial.body {
            Stmt::Block(statements) => statements,
            other => panic!("expected block, got {:?}", other),
        };
        assert!(matches!(body[0], Stmt::VarDecl { .. }));
        assert!(matches!(body[1], Stmt::While { .. }));
        assert!(matches!(body[2], Stmt::Return(Some(_))));
    }

    #[test]
    fn binary_operators_are_left_associative() {
        let expr = parse_expr("1 - 2 - 3");
        match expr.kind {
            ExprKind::Binary { op, left, .. } => {
                assert_eq!(op, BinaryOp::Sub);
                assert!(matches!(left.kind, ExprKind::Binary { op: BinaryOp::Sub, .. }));
            }
            other => panic!("expected binary, got {:?}", other),
        }
    }

    #[test]
    fn precedence_follows_the_ladder() {
        // "a || b && c == d < e + f * !g" parses bottom-up.
        let expr = parse_expr("a || b && c == d < e + f * !g");
        let ExprKind::Binary { op, right, .. } = expr.kind else {
            panic!("expected top-level ||");
        };
        assert_eq!(op, BinaryOp::Or);
        let ExprKind::Binary { op, .. } = right.kind else {
            panic!("expected && under ||");
        };
        assert_eq!(op, BinaryOp::And);
    }

    #[test]
    fn parentheses_regroup_without_extra_nodes() {
        let grouped = parse_expr("(1 + 2) * 3");
        match grouped.kind {
            ExprKind::Binary { op, left, .. } => {
                assert_eq!(op, BinaryOp::Mul);
                assert!(matches!(left.kind, ExprKind::Binary { op: BinaryOp::Add, .. }));
            }
            other => panic!("expected binary, got {:?}", other),
        }

        // A fully parenthesized atom is just the atom.
        let atom = parse_expr("((42))");
        assert_eq!(atom.kind, ExprKind::IntLiteral(42));
    }

    #[test]
    fn distinguishes_assignment_from_expression_statement() {
        let program = parse_source("func main() : int { x = 1; x + 1; return 0; }").unwrap();
        let statements = match &program.functions[0].body {
            Stmt::Block(statements) => statements,
            other => panic!("expected block, got {:?}", other),
        };
        assert!(matches!(&statements[0], Stmt::Assign { name, .. } if name == "x"));
        assert!(matches!(&statements[1], Stmt::Expr(_)));
    }

    #[test]
    fn missing_semicolon_points_at_the_next_token() {
        let error = parse_source("func main() : int { var x = 1 return x; }").unwrap_err();
        match error {
            ParseError::UnexpectedToken {
                message,
                line,
                column,
                found,
            } => {
                assert_eq!(message, "Expected ';' after variable declaration");
                assert_eq!(line, 1);
                assert_eq!(column, 31);
                assert_eq!(found, "return");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn empty_program_is_rejected() {
        assert_eq!(parse_source("   \n\n").unwrap_err(), ParseError::EmptyProgram);
    }

    #[test]
    fn trailing_commas_are_rejected() {
        assert!(parse_source("func f(a: int,) : int { return a; }").is_err());
        assert!(parse_source("func main() : int { return f(1,); }").is_err());
    }

    #[test]
    fn else_attaches_to_the_if() {
        let program = parse_source(
            "func main() : int { if (true) { return 1; } else { return 2; } }",
        )
        .unwrap();
        let statements = match &program.functions[0].body {
            Stmt::Block(statements) => statements,
            other => panic!("expected block, got {:?}", other),
        };
        assert!(matches!(
            &statements[0],
            Stmt::If { else_block: Some(_), .. }
        ));
    }

    #[test]
    fn return_without_value_parses() {
        let program = parse_source("func main() : int { return; }").unwrap();
        let statements = match &program.functions[0].body {
            Stmt::Block(statements) => statements,
            other => panic!("expected block, got {:?}", other),
        };
        assert!(matches!(&statements[0], Stmt::Return(None)));
    }

    #[test]
    fn nested_blocks_parse_as_statements() {
        let program =
            parse_source("func main() : int { { var x = 1; } return 0; }").unwrap();
        let statements = match &program.functions[0].body {
            Stmt::Block(statements) => statements,
            other => panic!("expected block, got {:?}", other),
        };
        assert!(matches!(&statements[0], Stmt::Block(_)));
    }

    #[test]
    fn error_at_end_of_input_names_eof() {
        let error = parse_source("func main() : int {").unwrap_err();
        match error {
            ParseError::UnexpectedToken { found, .. } => assert_eq!(found, "EOF"),
            other => panic!("unexpected error {:?}", other),
        }
    }
}
